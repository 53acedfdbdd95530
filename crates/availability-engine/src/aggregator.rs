//! Multi-provider availability for a bookable item at a location.
//!
//! Resolves the item's minimum duration, enumerates qualified providers, runs
//! the per-provider fetch-and-resolve steps concurrently, and concatenates the
//! per-provider results. Windows are never merged across providers.
//!
//! A failed fetch for any provider fails the whole call; no partial result is
//! returned.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::interval::Interval;
use crate::localizer::localize_all;
use crate::model::{AvailabilityWindow, BookableItemId, LocationId, ProviderId, ScheduleWindow};
use crate::ports::{BookableItemCatalog, BusyIntervalSource, ProviderDirectory, ScheduleRepository};
use crate::resolver::resolve_provider_windows;

/// Parameters of one availability lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub item_id: BookableItemId,
    pub location_id: LocationId,
    /// Overrides the item's required duration when set.
    #[serde(default)]
    pub min_duration_minutes: Option<u32>,
    /// Display timezone for the result. Falls back to the configured default.
    #[serde(default)]
    pub timezone: Option<Tz>,
}

impl AvailabilityQuery {
    pub fn new(item_id: impl Into<BookableItemId>, location_id: impl Into<LocationId>) -> Self {
        Self {
            item_id: item_id.into(),
            location_id: location_id.into(),
            min_duration_minutes: None,
            timezone: None,
        }
    }

    pub fn with_min_duration(mut self, minutes: u32) -> Self {
        self.min_duration_minutes = Some(minutes);
        self
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.timezone = Some(tz);
        self
    }
}

/// The availability service, wired to its collaborators at construction.
pub struct Scheduler {
    schedules: Arc<dyn ScheduleRepository>,
    busy: Arc<dyn BusyIntervalSource>,
    providers: Arc<dyn ProviderDirectory>,
    catalog: Arc<dyn BookableItemCatalog>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        schedules: Arc<dyn ScheduleRepository>,
        busy: Arc<dyn BusyIntervalSource>,
        providers: Arc<dyn ProviderDirectory>,
        catalog: Arc<dyn BookableItemCatalog>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            schedules,
            busy,
            providers,
            catalog,
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Bookable windows for `query` as of the current time.
    pub async fn get_availabilities(&self, query: &AvailabilityQuery) -> Result<Vec<AvailabilityWindow>> {
        self.get_availabilities_at(query, Utc::now()).await
    }

    /// Bookable windows for `query` as of `now`.
    ///
    /// Returns an empty list when no provider has a qualifying window. Unknown
    /// items or locations surface as `NotFound` from the collaborators. An
    /// invalid configuration, or a horizon past the representable range, is
    /// `Config`.
    #[tracing::instrument(
        skip_all,
        fields(item = %query.item_id, location = %query.location_id)
    )]
    pub async fn get_availabilities_at(
        &self,
        query: &AvailabilityQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<AvailabilityWindow>> {
        self.config.validate()?;
        let horizon_end = self.config.horizon_end(now)?;

        let item = self.catalog.item(query.item_id).await?;
        let min_minutes = query
            .min_duration_minutes
            .unwrap_or(item.required_duration_minutes);
        let min_duration = Duration::minutes(i64::from(min_minutes));

        let mut provider_ids = self
            .providers
            .providers_for(query.item_id, query.location_id)
            .await?;
        let mut seen = HashSet::new();
        provider_ids.retain(|id| seen.insert(*id));

        let per_provider = provider_ids.iter().map(|&provider_id| {
            self.provider_availability(provider_id, query.location_id, now, horizon_end, min_duration)
        });
        let windows: Vec<AvailabilityWindow> = try_join_all(per_provider)
            .await?
            .into_iter()
            .flatten()
            .collect();

        info!(
            providers = provider_ids.len(),
            windows = windows.len(),
            min_minutes,
            "resolved availability"
        );

        Ok(match query.timezone.or(self.config.default_timezone) {
            Some(tz) => localize_all(&windows, tz),
            None => windows,
        })
    }

    async fn provider_availability(
        &self,
        provider_id: ProviderId,
        location_id: LocationId,
        now: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
        min_duration: Duration,
    ) -> Result<Vec<AvailabilityWindow>> {
        let schedule = self
            .schedules
            .forward_windows(provider_id, location_id, now)
            .await
            .inspect_err(|e| warn!(provider = %provider_id, error = %e, "schedule fetch failed"))?;
        let schedule = clip_to_horizon(schedule, now, horizon_end);

        // Busy data must cover the part of a window that started before now.
        let busy_start = schedule
            .iter()
            .map(|w| w.interval.start)
            .min()
            .map_or(now, |earliest| earliest.min(now));

        let busy = self
            .busy
            .forward_busy_intervals(provider_id, busy_start, horizon_end)
            .await
            .inspect_err(|e| warn!(provider = %provider_id, error = %e, "busy interval fetch failed"))?;

        let mut windows = resolve_provider_windows(provider_id, &schedule, &busy, min_duration);
        windows.sort_by_key(|w| w.start);

        debug!(
            provider = %provider_id,
            schedule = schedule.len(),
            busy = busy.len(),
            windows = windows.len(),
            "resolved provider"
        );
        Ok(windows)
    }
}

/// Drop windows already over or starting past the horizon; truncate the rest
/// at the horizon end.
fn clip_to_horizon(
    schedule: Vec<ScheduleWindow>,
    now: DateTime<Utc>,
    horizon_end: DateTime<Utc>,
) -> Vec<ScheduleWindow> {
    schedule
        .into_iter()
        .filter(|w| w.interval.end > now && w.interval.start < horizon_end)
        .map(|w| ScheduleWindow {
            interval: Interval {
                start: w.interval.start,
                end: w.interval.end.min(horizon_end),
            },
            ..w
        })
        .collect()
}
