//! Reduce one provider's schedule windows by all of their busy intervals.
//!
//! Each busy interval is applied to the full working set produced by the
//! previous one, so fragments created by an earlier split are still checked
//! against every later busy interval. Busy intervals may arrive in any order
//! and may overlap each other.

use chrono::Duration;

use crate::interval::Interval;
use crate::model::{AvailabilityWindow, BusyInterval, ProviderId, ScheduleWindow};
use crate::splitter::split_window;

/// Free windows left after removing every busy interval from the schedule.
///
/// Schedule windows shorter than `min_duration` are dropped up front, so every
/// returned window is at least `min_duration` long and overlaps no busy
/// interval. Output order follows the input schedule order.
pub fn resolve_free_windows(
    schedule: &[Interval],
    busy: &[Interval],
    min_duration: Duration,
) -> Vec<Interval> {
    let initial: Vec<Interval> = schedule
        .iter()
        .copied()
        .filter(|w| w.duration() >= min_duration)
        .collect();

    busy.iter().fold(initial, |working, b| {
        working
            .into_iter()
            .flat_map(|w| split_window(w, *b, min_duration))
            .collect()
    })
}

/// Resolve a provider's availability and tag every window with its id.
///
/// Schedule windows belonging to other providers are ignored.
pub fn resolve_provider_windows(
    provider_id: ProviderId,
    schedule: &[ScheduleWindow],
    busy: &[BusyInterval],
    min_duration: Duration,
) -> Vec<AvailabilityWindow> {
    let schedule: Vec<Interval> = schedule
        .iter()
        .filter(|w| w.provider_id == provider_id)
        .map(|w| w.interval)
        .collect();
    let busy: Vec<Interval> = busy.iter().map(|b| b.interval).collect();

    resolve_free_windows(&schedule, &busy, min_duration)
        .into_iter()
        .map(|w| AvailabilityWindow::from_interval(w, Some(provider_id)))
        .collect()
}
