//! Display-timezone conversion for availability windows.
//!
//! Runs after all interval arithmetic. Only the UTC offset attached to each
//! boundary changes; the instants themselves are untouched, including across
//! DST transitions inside a window.

use chrono_tz::Tz;

use crate::error::{Result, SchedulerError};
use crate::model::AvailabilityWindow;

/// Parse an IANA timezone identifier (e.g. "America/New_York").
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse()
        .map_err(|_| SchedulerError::InvalidTimezone(name.to_string()))
}

/// Re-express a window's boundaries in `tz`.
pub fn localize(window: &AvailabilityWindow, tz: Tz) -> AvailabilityWindow {
    AvailabilityWindow {
        start: window.start.with_timezone(&tz).fixed_offset(),
        end: window.end.with_timezone(&tz).fixed_offset(),
        provider_id: window.provider_id,
    }
}

/// Localize every window of a result set.
pub fn localize_all(windows: &[AvailabilityWindow], tz: Tz) -> Vec<AvailabilityWindow> {
    windows.iter().map(|w| localize(w, tz)).collect()
}
