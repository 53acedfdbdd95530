//! Scheduler configuration.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::localizer::parse_timezone;

pub const DEFAULT_LOOKAHEAD_DAYS: u32 = 90;
/// Upper bound on `lookahead_days` (about ten years).
pub const MAX_LOOKAHEAD_DAYS: u32 = 3660;

pub const ENV_LOOKAHEAD_DAYS: &str = "AVAILABILITY_LOOKAHEAD_DAYS";
pub const ENV_DEFAULT_TIMEZONE: &str = "AVAILABILITY_DEFAULT_TIMEZONE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How far ahead of "now" busy intervals are fetched and windows offered.
    pub lookahead_days: u32,
    /// Display timezone used when a query does not name one. `None` keeps UTC.
    pub default_timezone: Option<Tz>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            default_timezone: None,
        }
    }
}

impl SchedulerConfig {
    /// Defaults overridden by `AVAILABILITY_LOOKAHEAD_DAYS` and
    /// `AVAILABILITY_DEFAULT_TIMEZONE` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_LOOKAHEAD_DAYS) {
            config.lookahead_days = raw.trim().parse().map_err(|_| {
                SchedulerError::Config(format!("{} must be a positive integer, got '{}'", ENV_LOOKAHEAD_DAYS, raw))
            })?;
        }

        if let Some(raw) = lookup(ENV_DEFAULT_TIMEZONE) {
            if !raw.trim().is_empty() {
                config.default_timezone = Some(parse_timezone(&raw)?);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lookahead_days == 0 {
            return Err(SchedulerError::Config(
                "lookahead_days must be at least 1".to_string(),
            ));
        }
        if self.lookahead_days > MAX_LOOKAHEAD_DAYS {
            return Err(SchedulerError::Config(format!(
                "lookahead_days must be at most {}, got {}",
                MAX_LOOKAHEAD_DAYS, self.lookahead_days
            )));
        }
        Ok(())
    }

    pub fn horizon(&self) -> Duration {
        Duration::days(i64::from(self.lookahead_days))
    }

    /// `now` plus the lookahead, or `Config` when that instant is out of range.
    pub fn horizon_end(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        now.checked_add_signed(self.horizon()).ok_or_else(|| {
            SchedulerError::Config(format!(
                "lookahead of {} days from {} is out of range",
                self.lookahead_days, now
            ))
        })
    }
}
