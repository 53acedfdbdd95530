//! Subtract one busy interval from one free window.
//!
//! Produces zero, one, or two fragments. Fragments shorter than the minimum
//! duration are dropped. Touching boundaries are not overlaps.

use chrono::Duration;

use crate::interval::Interval;

/// Remove `busy` from `window`, keeping fragments of at least `min_duration`.
///
/// - No overlap: returns `[window]` unchanged, even if `window` itself is
///   shorter than `min_duration`.
/// - `busy` covers `window`: returns `[]`.
/// - `busy` strictly inside `window`: up to two fragments, before and after.
pub fn split_window(window: Interval, busy: Interval, min_duration: Duration) -> Vec<Interval> {
    if !window.overlaps(&busy) {
        return vec![window];
    }

    let before = (busy.start > window.start).then_some(Interval {
        start: window.start,
        end: busy.start,
    });
    let after = (busy.end < window.end).then_some(Interval {
        start: busy.end,
        end: window.end,
    });

    [before, after]
        .into_iter()
        .flatten()
        .filter(|fragment| fragment.duration() >= min_duration)
        .collect()
}
