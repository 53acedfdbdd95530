//! Collaborator interfaces the aggregator depends on.
//!
//! Implementations live at the storage/calendar boundary (a relational store,
//! a live calendar read, or [`crate::memory::InMemoryStore`]). Failures should
//! be reported as [`SchedulerError::NotFound`](crate::SchedulerError::NotFound)
//! for unknown ids and [`SchedulerError::Collaborator`](crate::SchedulerError::Collaborator)
//! for I/O problems.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{BookableItem, BookableItemId, BusyInterval, LocationId, ProviderId, ScheduleWindow};

/// Concrete working-hour windows for a provider at a location.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Windows for `provider_id` at `location_id` whose end is after `now`.
    async fn forward_windows(
        &self,
        provider_id: ProviderId,
        location_id: LocationId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduleWindow>>;
}

/// A provider's existing commitments.
#[async_trait]
pub trait BusyIntervalSource: Send + Sync {
    /// Busy intervals of `provider_id` overlapping `[horizon_start, horizon_end)`.
    async fn forward_busy_intervals(
        &self,
        provider_id: ProviderId,
        horizon_start: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>>;
}

/// Which providers can deliver an item at a location.
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    async fn providers_for(
        &self,
        item_id: BookableItemId,
        location_id: LocationId,
    ) -> Result<Vec<ProviderId>>;
}

/// Lookup of bookable items and their required durations.
#[async_trait]
pub trait BookableItemCatalog: Send + Sync {
    async fn item(&self, item_id: BookableItemId) -> Result<BookableItem>;
}
