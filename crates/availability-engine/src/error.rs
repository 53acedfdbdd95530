//! Error types for availability-engine operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Invalid interval: start {start} is not before end {end}")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid schedule rule: {0}")]
    InvalidRule(String),

    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },

    /// A schedule or busy-interval fetch failed for one provider.
    #[error("Collaborator failure for provider {provider}: {message}")]
    Collaborator { provider: String, message: String },

    #[error("Invalid calendar event: {0}")]
    InvalidEvent(String),

    #[error("Unsupported calendar service: {0}")]
    UnsupportedCalendar(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SchedulerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn collaborator(provider: impl ToString, message: impl ToString) -> Self {
        Self::Collaborator {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }

    /// True when a lookup failed, as opposed to an empty availability result
    /// or an I/O failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
