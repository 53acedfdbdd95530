//! Tests for multi-provider availability over injected collaborators.

use std::sync::Arc;

use async_trait::async_trait;
use availability_engine::expander::WeeklySchedule;
use availability_engine::memory::{Appointment, InMemoryStore, Location, Offering};
use availability_engine::model::{
    BookableItem, BookableItemId, BusyInterval, LocationId, ProviderId, ScheduleWindow,
};
use availability_engine::ports::{BusyIntervalSource, ProviderDirectory, ScheduleRepository};
use availability_engine::{
    render_tool_result, AvailabilityQuery, Interval, Scheduler, SchedulerConfig, SchedulerError,
};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};

// ── Helpers ─────────────────────────────────────────────────────────────────

const ITEM: i64 = 100;
const LOCATION: i64 = 10;

fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, d, h, m, 0).unwrap()
}

fn iv(d: u32, sh: u32, sm: u32, eh: u32, em: u32) -> Interval {
    Interval::new(utc(d, sh, sm), utc(d, eh, em)).unwrap()
}

/// Mondays 09:00-17:00 UTC in March 2026.
fn mondays(provider: i64) -> WeeklySchedule {
    WeeklySchedule {
        provider_id: ProviderId(provider),
        location_id: LocationId(LOCATION),
        weekday: Weekday::Mon,
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        effective_on: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        expires_on: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
        timezone: chrono_tz::UTC,
        exceptions: vec![],
    }
}

fn appointment(provider: i64, interval: Interval) -> Appointment {
    Appointment {
        id: None,
        provider_id: ProviderId(provider),
        start: interval.start,
        end: interval.end,
    }
}

/// Providers 1 and 2 both deliver the item at the location.
fn store(appointments: Vec<Appointment>) -> InMemoryStore {
    InMemoryStore {
        items: vec![BookableItem {
            id: BookableItemId(ITEM),
            required_duration_minutes: 60,
            description: "Consultation".to_string(),
        }],
        locations: vec![
            Location {
                id: LocationId(LOCATION),
                description: "Main St".to_string(),
                items: vec![BookableItemId(ITEM)],
            },
            Location {
                id: LocationId(11),
                description: "Annex".to_string(),
                items: vec![],
            },
        ],
        offerings: vec![
            Offering {
                provider_id: ProviderId(1),
                item_id: BookableItemId(ITEM),
            },
            Offering {
                provider_id: ProviderId(2),
                item_id: BookableItemId(ITEM),
            },
        ],
        schedules: vec![mondays(1), mondays(2)],
        appointments,
        ..InMemoryStore::default()
    }
}

/// One day of lookahead keeps a Monday-midnight query to that Monday only.
fn one_day() -> SchedulerConfig {
    SchedulerConfig {
        lookahead_days: 1,
        ..SchedulerConfig::default()
    }
}

fn scheduler(store: InMemoryStore, config: SchedulerConfig) -> Scheduler {
    let store = Arc::new(store);
    Scheduler::new(store.clone(), store.clone(), store.clone(), store, config)
}

fn query() -> AvailabilityQuery {
    AvailabilityQuery::new(ITEM, LOCATION)
}

/// Busy source that fails for one provider and is empty for the rest.
struct FailingFor(ProviderId);

#[async_trait]
impl BusyIntervalSource for FailingFor {
    async fn forward_busy_intervals(
        &self,
        provider_id: ProviderId,
        _horizon_start: DateTime<Utc>,
        _horizon_end: DateTime<Utc>,
    ) -> availability_engine::error::Result<Vec<BusyInterval>> {
        if provider_id == self.0 {
            Err(SchedulerError::collaborator(provider_id, "calendar API timed out"))
        } else {
            Ok(vec![])
        }
    }
}

/// Schedule repository that fails for one provider and delegates the rest.
struct ScheduleFailsFor(ProviderId, Arc<InMemoryStore>);

#[async_trait]
impl ScheduleRepository for ScheduleFailsFor {
    async fn forward_windows(
        &self,
        provider_id: ProviderId,
        location_id: LocationId,
        now: DateTime<Utc>,
    ) -> availability_engine::error::Result<Vec<ScheduleWindow>> {
        if provider_id == self.0 {
            Err(SchedulerError::collaborator(provider_id, "schedule table unavailable"))
        } else {
            self.1.forward_windows(provider_id, location_id, now).await
        }
    }
}

/// Directory that lists the same provider twice.
struct Duplicates;

#[async_trait]
impl ProviderDirectory for Duplicates {
    async fn providers_for(
        &self,
        _item_id: BookableItemId,
        _location_id: LocationId,
    ) -> availability_engine::error::Result<Vec<ProviderId>> {
        Ok(vec![ProviderId(2), ProviderId(2)])
    }
}

// ── Aggregation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn fully_booked_provider_contributes_nothing() {
    let s = scheduler(store(vec![appointment(1, iv(2, 9, 0, 17, 0))]), one_day());

    let windows = s.get_availabilities_at(&query(), utc(2, 0, 0)).await.unwrap();

    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].provider_id, Some(ProviderId(2)));
    assert_eq!(windows[0].interval(), iv(2, 9, 0, 17, 0));
}

#[tokio::test]
async fn windows_are_not_merged_across_providers() {
    let s = scheduler(store(vec![]), one_day());

    let windows = s.get_availabilities_at(&query(), utc(2, 0, 0)).await.unwrap();

    // Identical free windows for both providers stay separate.
    assert_eq!(windows.len(), 2);
    let mut providers: Vec<_> = windows.iter().filter_map(|w| w.provider_id).collect();
    providers.sort();
    assert_eq!(providers, vec![ProviderId(1), ProviderId(2)]);
    assert!(windows.iter().all(|w| w.interval() == iv(2, 9, 0, 17, 0)));
}

#[tokio::test]
async fn item_duration_is_the_default_minimum() {
    // Provider 1: free 09:00-10:00, 10:30-11:15 (45 min), 12:00-17:00.
    let appointments = vec![
        appointment(1, iv(2, 10, 0, 10, 30)),
        appointment(1, iv(2, 11, 15, 12, 0)),
        appointment(2, iv(2, 9, 0, 17, 0)),
    ];
    let s = scheduler(store(appointments), one_day());

    let windows = s.get_availabilities_at(&query(), utc(2, 0, 0)).await.unwrap();
    let intervals: Vec<_> = windows.iter().map(|w| w.interval()).collect();
    assert_eq!(intervals, vec![iv(2, 9, 0, 10, 0), iv(2, 12, 0, 17, 0)]);

    let windows = s
        .get_availabilities_at(&query().with_min_duration(30), utc(2, 0, 0))
        .await
        .unwrap();
    assert_eq!(windows.len(), 3);
    assert_eq!(windows[1].interval(), iv(2, 10, 30, 11, 15));
    assert_eq!(windows[1].duration_minutes(), 45);
}

#[tokio::test]
async fn repeated_calls_return_the_same_windows() {
    let s = scheduler(store(vec![appointment(1, iv(2, 13, 0, 14, 0))]), one_day());
    let a = s.get_availabilities_at(&query(), utc(2, 0, 0)).await.unwrap();
    let b = s.get_availabilities_at(&query(), utc(2, 0, 0)).await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn duplicate_providers_are_resolved_once() {
    let store = Arc::new(store(vec![]));
    let s = Scheduler::new(
        store.clone(),
        store.clone(),
        Arc::new(Duplicates),
        store,
        one_day(),
    );

    let windows = s.get_availabilities_at(&query(), utc(2, 0, 0)).await.unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].provider_id, Some(ProviderId(2)));
}

// ── Horizon ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn windows_are_truncated_at_the_horizon() {
    // Horizon ends Monday 13:00.
    let s = scheduler(store(vec![]), one_day());
    let windows = s.get_availabilities_at(&query(), utc(1, 13, 0)).await.unwrap();

    assert_eq!(windows.len(), 2);
    assert!(windows.iter().all(|w| w.interval() == iv(2, 9, 0, 13, 0)));
}

#[tokio::test]
async fn window_in_progress_still_excludes_earlier_appointments() {
    let s = scheduler(store(vec![appointment(2, iv(2, 10, 0, 11, 0))]), one_day());
    let windows = s.get_availabilities_at(&query(), utc(2, 12, 0)).await.unwrap();

    let provider_two: Vec<_> = windows
        .iter()
        .filter(|w| w.provider_id == Some(ProviderId(2)))
        .map(|w| w.interval())
        .collect();
    assert_eq!(provider_two, vec![iv(2, 9, 0, 10, 0), iv(2, 11, 0, 17, 0)]);
}

#[tokio::test]
async fn past_windows_are_not_offered() {
    let s = scheduler(store(vec![]), one_day());
    let windows = s.get_availabilities_at(&query(), utc(2, 18, 0)).await.unwrap();
    assert!(windows.is_empty());
}

// ── Errors vs. empty results ────────────────────────────────────────────────

#[tokio::test]
async fn unknown_item_is_not_found() {
    let s = scheduler(store(vec![]), one_day());
    let err = s
        .get_availabilities_at(&AvailabilityQuery::new(999, LOCATION), utc(2, 0, 0))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn unknown_location_is_not_found() {
    let s = scheduler(store(vec![]), one_day());
    let err = s
        .get_availabilities_at(&AvailabilityQuery::new(ITEM, 999), utc(2, 0, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::NotFound { entity: "location", .. }));
}

#[tokio::test]
async fn item_not_offered_at_location_is_empty_not_an_error() {
    let s = scheduler(store(vec![]), one_day());
    let windows = s
        .get_availabilities_at(&AvailabilityQuery::new(ITEM, 11), utc(2, 0, 0))
        .await
        .unwrap();
    assert!(windows.is_empty());
}

#[tokio::test]
async fn one_provider_failure_fails_the_whole_call() {
    let store = Arc::new(store(vec![]));
    let s = Scheduler::new(
        store.clone(),
        Arc::new(FailingFor(ProviderId(2))),
        store.clone(),
        store,
        one_day(),
    );

    let err = s.get_availabilities_at(&query(), utc(2, 0, 0)).await.unwrap_err();
    match err {
        SchedulerError::Collaborator { provider, message } => {
            assert_eq!(provider, "2");
            assert!(message.contains("timed out"));
        }
        other => panic!("expected collaborator failure, got {:?}", other),
    }
}

#[tokio::test]
async fn schedule_fetch_failure_fails_the_whole_call() {
    let store = Arc::new(store(vec![]));
    let s = Scheduler::new(
        Arc::new(ScheduleFailsFor(ProviderId(1), store.clone())),
        store.clone(),
        store.clone(),
        store,
        one_day(),
    );

    let err = s.get_availabilities_at(&query(), utc(2, 0, 0)).await.unwrap_err();
    match err {
        SchedulerError::Collaborator { provider, message } => {
            assert_eq!(provider, "1");
            assert!(message.contains("schedule table"));
        }
        other => panic!("expected collaborator failure, got {:?}", other),
    }
}

#[tokio::test]
async fn zero_length_appointment_does_not_fail_the_call() {
    let marker = Appointment {
        id: Some(7),
        provider_id: ProviderId(2),
        start: utc(2, 12, 0),
        end: utc(2, 12, 0),
    };
    let s = scheduler(store(vec![marker]), one_day());

    let windows = s.get_availabilities_at(&query(), utc(2, 0, 0)).await.unwrap();

    // Both providers keep their full day.
    assert_eq!(windows.len(), 2);
    assert!(windows.iter().all(|w| w.interval() == iv(2, 9, 0, 17, 0)));
}

#[tokio::test]
async fn oversized_lookahead_is_a_config_error() {
    let config = SchedulerConfig {
        lookahead_days: u32::MAX,
        ..SchedulerConfig::default()
    };
    let s = scheduler(store(vec![]), config);

    let err = s.get_availabilities_at(&query(), utc(2, 0, 0)).await.unwrap_err();
    assert!(matches!(err, SchedulerError::Config(_)));
}

#[tokio::test]
async fn horizon_past_the_last_instant_is_a_config_error() {
    let s = scheduler(store(vec![]), one_day());

    let err = s
        .get_availabilities_at(&query(), DateTime::<Utc>::MAX_UTC)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Config(_)));
}

#[tokio::test]
async fn store_expansion_past_the_last_instant_is_an_error() {
    let err = store(vec![])
        .forward_windows(ProviderId(1), LocationId(LOCATION), DateTime::<Utc>::MAX_UTC)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Config(_)));
}

// ── Presentation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn requested_timezone_localizes_every_window() {
    let s = scheduler(store(vec![]), one_day());
    let q = query().with_timezone(chrono_tz::America::New_York);
    let windows = s.get_availabilities_at(&q, utc(2, 0, 0)).await.unwrap();

    assert_eq!(windows.len(), 2);
    for w in &windows {
        assert_eq!(w.start.to_rfc3339(), "2026-03-02T04:00:00-05:00");
        assert_eq!(w.end.to_rfc3339(), "2026-03-02T12:00:00-05:00");
    }
}

#[tokio::test]
async fn configured_default_timezone_applies_when_query_has_none() {
    let config = SchedulerConfig {
        default_timezone: Some(chrono_tz::Asia::Tokyo),
        ..one_day()
    };
    let s = scheduler(store(vec![]), config);
    let windows = s.get_availabilities_at(&query(), utc(2, 0, 0)).await.unwrap();
    assert!(windows
        .iter()
        .all(|w| w.start.to_rfc3339() == "2026-03-02T18:00:00+09:00"));
}

#[tokio::test]
async fn result_serializes_with_duration() {
    let s = scheduler(store(vec![appointment(1, iv(2, 9, 0, 17, 0))]), one_day());
    let windows = s.get_availabilities_at(&query(), utc(2, 0, 0)).await.unwrap();

    let json = serde_json::to_value(&windows).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{
            "start": "2026-03-02T09:00:00+00:00",
            "end": "2026-03-02T17:00:00+00:00",
            "provider_id": 2,
            "duration_minutes": 480
        }])
    );
}

#[tokio::test]
async fn tool_result_lists_one_window_per_line() {
    let s = scheduler(store(vec![]), one_day());
    let windows = s.get_availabilities_at(&query(), utc(2, 0, 0)).await.unwrap();
    let text = render_tool_result(&windows);

    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("Monday, March 02, 2026 09:00-17:00 (UTC+00:00), 480 min, provider 1"));
    assert!(text.contains("provider 2"));
}
