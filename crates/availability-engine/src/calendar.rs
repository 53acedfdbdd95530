//! Busy intervals read from an external calendar.
//!
//! Calendar APIs report events with `start`/`end` objects holding either an
//! RFC 3339 `dateTime`, a naive local `dateTime` plus an IANA `timeZone`, or an
//! all-day `date`. [`CalendarBusySource`] turns those into [`BusyInterval`]s so
//! the aggregator never sees calendar-specific shapes.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SchedulerError};
use crate::interval::Interval;
use crate::localizer::parse_timezone;
use crate::model::{BusyInterval, ProviderId};
use crate::ports::BusyIntervalSource;

/// Supported calendar backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarService {
    Google,
}

impl FromStr for CalendarService {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            _ => Err(SchedulerError::UnsupportedCalendar(s.to_string())),
        }
    }
}

impl fmt::Display for CalendarService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Google => write!(f, "google"),
        }
    }
}

impl CalendarService {
    /// Whether an event occupies the calendar owner's time.
    pub fn blocks_time(&self, event: &CalendarEvent) -> bool {
        match self {
            Self::Google => {
                event.status.as_deref() != Some("cancelled")
                    && event.transparency.as_deref() != Some("transparent")
            }
        }
    }
}

/// One side (start or end) of a calendar event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    fn zone(&self) -> Result<Option<Tz>> {
        self.time_zone.as_deref().map(parse_timezone).transpose()
    }

    /// The absolute instant this time denotes.
    ///
    /// Naive local times are resolved in `timeZone`, taking the earlier reading
    /// of an ambiguous time. All-day dates start at local midnight (UTC when no
    /// zone is given).
    pub fn resolve(&self) -> Result<DateTime<Utc>> {
        if let Some(raw) = &self.date_time {
            if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
                return Ok(dt.with_timezone(&Utc));
            }
            let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .map_err(|e| SchedulerError::InvalidEvent(format!("bad dateTime '{}': {}", raw, e)))?;
            let tz = self.zone()?.ok_or_else(|| {
                SchedulerError::InvalidEvent(format!("dateTime '{}' has no offset and no timeZone", raw))
            })?;
            return local_to_utc(tz, naive);
        }

        if let Some(date) = self.date {
            let midnight = date.and_time(NaiveTime::MIN);
            return match self.zone()? {
                Some(tz) => local_to_utc(tz, midnight),
                None => Ok(midnight.and_utc()),
            };
        }

        Err(SchedulerError::InvalidEvent(
            "event time has neither dateTime nor date".to_string(),
        ))
    }
}

fn local_to_utc(tz: Tz, naive: NaiveDateTime) -> Result<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            SchedulerError::InvalidEvent(format!("{} does not exist in {}", naive, tz.name()))
        })
}

/// A calendar event as returned by a calendar API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub summary: String,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparency: Option<String>,
}

impl CalendarEvent {
    /// Convert to a busy interval carrying the event id as its reference.
    ///
    /// Zero-length events (reminders, markers) occupy no time and yield
    /// `None`. An event ending before it starts is an error.
    pub fn to_busy_interval(&self) -> Result<Option<BusyInterval>> {
        let start = self.start.resolve()?;
        let end = self.end.resolve()?;
        if start == end {
            return Ok(None);
        }
        Ok(Some(BusyInterval {
            interval: Interval::new(start, end)?,
            reference: self.id.clone(),
        }))
    }
}

/// Read access to one calendar backend.
#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// Single (expanded) events of `calendar_id` overlapping `[time_min, time_max)`.
    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>>;
}

/// [`BusyIntervalSource`] backed by live calendar reads.
pub struct CalendarBusySource {
    service: CalendarService,
    client: Arc<dyn CalendarClient>,
    calendars: HashMap<ProviderId, String>,
}

impl CalendarBusySource {
    /// `calendars` maps each provider to the calendar id holding their
    /// appointments.
    pub fn new(
        service: CalendarService,
        client: Arc<dyn CalendarClient>,
        calendars: HashMap<ProviderId, String>,
    ) -> Self {
        Self {
            service,
            client,
            calendars,
        }
    }

    /// Like [`new`](Self::new), parsing the stored service tag (e.g. "google").
    pub fn from_tag(
        tag: &str,
        client: Arc<dyn CalendarClient>,
        calendars: HashMap<ProviderId, String>,
    ) -> Result<Self> {
        Ok(Self::new(tag.parse()?, client, calendars))
    }

    pub fn service(&self) -> CalendarService {
        self.service
    }
}

#[async_trait]
impl BusyIntervalSource for CalendarBusySource {
    async fn forward_busy_intervals(
        &self,
        provider_id: ProviderId,
        horizon_start: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>> {
        let calendar_id = self
            .calendars
            .get(&provider_id)
            .ok_or_else(|| SchedulerError::not_found("calendar for provider", provider_id))?;

        let events = self
            .client
            .list_events(calendar_id, horizon_start, horizon_end)
            .await
            .map_err(|e| match e {
                failure @ SchedulerError::Collaborator { .. } => failure,
                other => SchedulerError::collaborator(provider_id, other),
            })?;

        let busy = events
            .iter()
            .filter(|event| self.service.blocks_time(event))
            .filter_map(|event| {
                event
                    .to_busy_interval()
                    .map_err(|e| SchedulerError::collaborator(provider_id, e))
                    .transpose()
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            provider = %provider_id,
            service = %self.service,
            events = events.len(),
            busy = busy.len(),
            "read calendar"
        );
        Ok(busy)
    }
}
