//! # availability-engine
//!
//! Bookable availability windows for service providers.
//!
//! Given a provider's working-hour windows and the time ranges they are already
//! booked for, the engine computes the free windows long enough for a bookable
//! item, across every provider qualified for that item at a location, and
//! presents them in the caller's timezone. Interval arithmetic is pure and
//! synchronous; I/O happens only behind the collaborator traits in [`ports`].
//!
//! ## Modules
//!
//! - [`interval`] -- half-open `[start, end)` instants with overlap helpers
//! - [`splitter`] -- subtract one busy interval from one free window
//! - [`resolver`] -- reduce one provider's schedule by all their busy intervals
//! - [`aggregator`] -- multi-provider lookup over injected collaborators
//! - [`model`] -- ids, schedule/busy/availability records
//! - [`localizer`] -- display-timezone conversion
//! - [`ports`] -- collaborator traits (schedules, busy intervals, providers, items)
//! - [`expander`] -- weekly schedule templates -> concrete windows
//! - [`calendar`] -- calendar events -> busy intervals
//! - [`memory`] -- in-memory collaborators
//! - [`config`] -- scheduler configuration
//! - [`error`] -- Error types

pub mod aggregator;
pub mod calendar;
pub mod config;
pub mod error;
pub mod expander;
pub mod interval;
pub mod localizer;
pub mod memory;
pub mod model;
pub mod ports;
pub mod resolver;
pub mod splitter;

pub use aggregator::{AvailabilityQuery, Scheduler};
pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use interval::Interval;
pub use localizer::{localize, localize_all, parse_timezone};
pub use model::{
    render_tool_result, AvailabilityWindow, BookableItem, BookableItemId, BusyInterval, LocationId,
    ProviderId, ScheduleWindow,
};
pub use resolver::{resolve_free_windows, resolve_provider_windows};
pub use splitter::split_window;
