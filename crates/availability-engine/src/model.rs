//! Identifiers and records flowing through the scheduler.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::interval::Interval;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// The person or resource whose time is booked (an associate).
    ProviderId
);
id_type!(LocationId);
id_type!(
    /// A bookable service (a product).
    BookableItemId
);

/// One concrete block of a provider's working hours at a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub provider_id: ProviderId,
    pub location_id: LocationId,
    #[serde(flatten)]
    pub interval: Interval,
}

/// An existing commitment (an appointment) that removes availability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusyInterval {
    #[serde(flatten)]
    pub interval: Interval,
    /// External reference, e.g. a calendar event id or appointment row id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl From<Interval> for BusyInterval {
    fn from(interval: Interval) -> Self {
        Self {
            interval,
            reference: None,
        }
    }
}

/// The service being booked and the minimum window it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookableItem {
    pub id: BookableItemId,
    pub required_duration_minutes: u32,
    #[serde(default)]
    pub description: String,
}

/// A bookable free window for one provider.
///
/// Boundaries carry a display offset. Equality compares absolute instants, so a
/// window and its localized copy are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AvailabilityWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub provider_id: Option<ProviderId>,
}

impl AvailabilityWindow {
    /// A UTC-offset window covering `interval`.
    pub fn from_interval(interval: Interval, provider_id: Option<ProviderId>) -> Self {
        Self {
            start: interval.start.fixed_offset(),
            end: interval.end.fixed_offset(),
            provider_id,
        }
    }

    /// The window as an absolute-instant interval.
    pub fn interval(&self) -> Interval {
        Interval {
            start: self.start.with_timezone(&Utc),
            end: self.end.with_timezone(&Utc),
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes().max(0)
    }
}

impl Serialize for AvailabilityWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AvailabilityWindow", 4)?;
        state.serialize_field("start", &self.start.to_rfc3339())?;
        state.serialize_field("end", &self.end.to_rfc3339())?;
        state.serialize_field("provider_id", &self.provider_id)?;
        state.serialize_field("duration_minutes", &self.duration_minutes())?;
        state.end()
    }
}

impl fmt::Display for AvailabilityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{} (UTC{}), {} min",
            self.start.format("%A, %B %d, %Y"),
            self.start.format("%H:%M"),
            self.end.format("%H:%M"),
            self.start.format("%:z"),
            self.duration_minutes()
        )?;
        match self.provider_id {
            Some(id) => write!(f, ", provider {}", id),
            None => write!(f, ", unassigned"),
        }
    }
}

/// Render windows one per line, the form handed back to the assistant as a
/// tool result.
pub fn render_tool_result(windows: &[AvailabilityWindow]) -> String {
    windows
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
