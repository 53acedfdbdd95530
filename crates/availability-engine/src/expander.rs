//! Weekly working-hour templates -> concrete schedule windows.
//!
//! A template says "Mondays 09:00-17:00 in America/New_York, effective March 1
//! through December 31". Expansion goes through the `rrule` crate so wall-clock
//! times stay fixed across DST changes; the UTC instants shift instead.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use rrule::RRuleSet;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::interval::Interval;
use crate::model::{LocationId, ProviderId, ScheduleWindow};

/// A recurring weekly block of working hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub provider_id: ProviderId,
    pub location_id: LocationId,
    pub weekday: Weekday,
    /// Local wall-clock start.
    pub start_time: NaiveTime,
    /// Local wall-clock end, same day.
    pub end_time: NaiveTime,
    /// First date the template applies (inclusive).
    pub effective_on: NaiveDate,
    /// Last date the template applies (inclusive).
    pub expires_on: NaiveDate,
    pub timezone: Tz,
    /// Local dates with no working hours (holidays, leave).
    #[serde(default)]
    pub exceptions: Vec<NaiveDate>,
}

fn byday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// First date on or after `date` falling on `weekday`.
fn next_weekday(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (7 + weekday.num_days_from_monday() - date.weekday().num_days_from_monday()) % 7;
    date + Duration::days(i64::from(ahead))
}

/// Resolve a local wall-clock time to an instant, taking the earlier reading of
/// an ambiguous time. `None` for times skipped by a DST gap.
fn local_instant(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Expand one template into windows overlapping `[from, until)`.
///
/// # Errors
/// Returns `SchedulerError::InvalidRule` if the template's end time is not after
/// its start time, if it expires before it takes effect, if the range spans
/// more weeks than one expansion holds, or if the generated recurrence rule is
/// rejected.
pub fn expand_weekly(
    schedule: &WeeklySchedule,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<ScheduleWindow>> {
    if schedule.end_time <= schedule.start_time {
        return Err(SchedulerError::InvalidRule(format!(
            "end time {} is not after start time {}",
            schedule.end_time, schedule.start_time
        )));
    }
    if schedule.expires_on < schedule.effective_on {
        return Err(SchedulerError::InvalidRule(format!(
            "expires on {} before taking effect on {}",
            schedule.expires_on, schedule.effective_on
        )));
    }
    if from >= until {
        return Ok(Vec::new());
    }

    let tz = schedule.timezone;

    // Skip history before the requested range; one day of slack covers
    // timezones ahead of UTC.
    let from_local = from.with_timezone(&tz).date_naive() - Duration::days(1);
    let first = next_weekday(schedule.effective_on.max(from_local), schedule.weekday);
    let until_local = until.with_timezone(&tz).date_naive();
    let last = schedule.expires_on.min(until_local);
    if first > last {
        return Ok(Vec::new());
    }

    let weeks = (last - first).num_days() / 7 + 1;
    let count = u16::try_from(weeks).map_err(|_| {
        SchedulerError::InvalidRule(format!(
            "{} weeks from {} to {} exceeds the {} occurrences one expansion can hold",
            weeks,
            first,
            last,
            u16::MAX
        ))
    })?;

    let dtstart_ical = first.and_time(schedule.start_time).format("%Y%m%dT%H%M%S");
    let rrule_text = format!(
        "DTSTART;TZID={}:{}\nRRULE:FREQ=WEEKLY;BYDAY={};COUNT={}",
        tz.name(),
        dtstart_ical,
        byday(schedule.weekday),
        count
    );

    let rrule_set: RRuleSet = rrule_text
        .parse()
        .map_err(|e| SchedulerError::InvalidRule(format!("{}", e)))?;

    let windows = rrule_set
        .all(count)
        .dates
        .into_iter()
        .filter_map(|dt| {
            let date = dt.with_timezone(&tz).date_naive();
            if schedule.exceptions.contains(&date) {
                return None;
            }
            let start = dt.with_timezone(&Utc);
            // A DST gap at the end time falls back to the nominal length.
            let end = local_instant(tz, date, schedule.end_time)
                .unwrap_or(start + (schedule.end_time - schedule.start_time));
            Interval::new(start, end).ok()
        })
        .filter(|interval| interval.end > from && interval.start < until)
        .map(|interval| ScheduleWindow {
            provider_id: schedule.provider_id,
            location_id: schedule.location_id,
            interval,
        })
        .collect();

    Ok(windows)
}

/// Expand several templates, concatenating results.
pub fn expand_all(
    schedules: &[WeeklySchedule],
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<ScheduleWindow>> {
    let mut windows = Vec::new();
    for schedule in schedules {
        windows.extend(expand_weekly(schedule, from, until)?);
    }
    windows.sort_by_key(|w| w.interval.start);
    Ok(windows)
}
