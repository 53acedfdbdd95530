//! In-memory collaborators backed by a serde-loadable snapshot.
//!
//! Holds the same shapes a relational store would: items, locations with the
//! items they offer, provider/item links, weekly schedule templates, and booked
//! appointments. Implements every port in [`crate::ports`].

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::expander::{expand_all, WeeklySchedule};
use crate::interval::Interval;
use crate::model::{
    BookableItem, BookableItemId, BusyInterval, LocationId, ProviderId, ScheduleWindow,
};
use crate::ports::{BookableItemCatalog, BusyIntervalSource, ProviderDirectory, ScheduleRepository};

/// How far past "now" schedule templates are expanded by default. Callers
/// with a longer lookahead should raise `expansion_days` to match.
pub const DEFAULT_EXPANSION_DAYS: u32 = 366;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    #[serde(default)]
    pub description: String,
    /// Items offered at this location.
    #[serde(default)]
    pub items: Vec<BookableItemId>,
}

/// A provider qualified to deliver an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offering {
    pub provider_id: ProviderId,
    pub item_id: BookableItemId,
}

/// A booked appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub provider_id: ProviderId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryStore {
    pub items: Vec<BookableItem>,
    pub locations: Vec<Location>,
    pub offerings: Vec<Offering>,
    pub schedules: Vec<WeeklySchedule>,
    pub appointments: Vec<Appointment>,
    pub expansion_days: u32,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            locations: Vec::new(),
            offerings: Vec::new(),
            schedules: Vec::new(),
            appointments: Vec::new(),
            expansion_days: DEFAULT_EXPANSION_DAYS,
        }
    }
}

#[async_trait]
impl ScheduleRepository for InMemoryStore {
    async fn forward_windows(
        &self,
        provider_id: ProviderId,
        location_id: LocationId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduleWindow>> {
        let templates: Vec<WeeklySchedule> = self
            .schedules
            .iter()
            .filter(|s| s.provider_id == provider_id && s.location_id == location_id)
            .cloned()
            .collect();
        let until = now
            .checked_add_signed(Duration::days(i64::from(self.expansion_days)))
            .ok_or_else(|| {
                SchedulerError::Config(format!(
                    "expansion of {} days from {} is out of range",
                    self.expansion_days, now
                ))
            })?;
        expand_all(&templates, now, until)
    }
}

#[async_trait]
impl BusyIntervalSource for InMemoryStore {
    async fn forward_busy_intervals(
        &self,
        provider_id: ProviderId,
        horizon_start: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>> {
        self.appointments
            .iter()
            .filter(|a| a.provider_id == provider_id)
            .filter(|a| a.start < horizon_end && a.end > horizon_start)
            // Zero-length bookings overlap nothing.
            .filter(|a| a.start != a.end)
            .map(|a| {
                let interval = Interval::new(a.start, a.end)
                    .map_err(|e| SchedulerError::collaborator(provider_id, e))?;
                Ok(BusyInterval {
                    interval,
                    reference: a.id.map(|id| id.to_string()),
                })
            })
            .collect()
    }
}

#[async_trait]
impl ProviderDirectory for InMemoryStore {
    /// Providers linked to the item that also work at the location.
    async fn providers_for(
        &self,
        item_id: BookableItemId,
        location_id: LocationId,
    ) -> Result<Vec<ProviderId>> {
        let location = self
            .locations
            .iter()
            .find(|l| l.id == location_id)
            .ok_or_else(|| SchedulerError::not_found("location", location_id))?;
        if !location.items.contains(&item_id) {
            return Ok(Vec::new());
        }

        let scheduled_here: BTreeSet<ProviderId> = self
            .schedules
            .iter()
            .filter(|s| s.location_id == location_id)
            .map(|s| s.provider_id)
            .collect();

        let providers: BTreeSet<ProviderId> = self
            .offerings
            .iter()
            .filter(|o| o.item_id == item_id && scheduled_here.contains(&o.provider_id))
            .map(|o| o.provider_id)
            .collect();
        Ok(providers.into_iter().collect())
    }
}

#[async_trait]
impl BookableItemCatalog for InMemoryStore {
    async fn item(&self, item_id: BookableItemId) -> Result<BookableItem> {
        self.items
            .iter()
            .find(|i| i.id == item_id)
            .cloned()
            .ok_or_else(|| SchedulerError::not_found("bookable item", item_id))
    }
}
