//! Tunable constants of the progress engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{field} must be positive and finite, got {provided}")]
    NonPositive { field: &'static str, provided: f64 },

    #[error("behind threshold must be in (0, 1], got {0}")]
    InvalidBehindThreshold(f64),
}

/// Period lengths and the status threshold used by
/// [`crate::progress::ScheduleProgressEngine`].
///
/// Months are a fixed number of days; there is no calendar-month logic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub days_per_week: f64,
    pub days_per_month: f64,
    /// Largest deficit ratio still reported as `behind` rather than
    /// `significantly_behind`.
    pub behind_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            days_per_week: 7.0,
            days_per_month: 30.0,
            behind_threshold: 0.25,
        }
    }
}

impl EngineConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` if a period length is not positive and finite or
    /// the threshold is outside `(0, 1]`.
    pub fn validate(self) -> Result<Self, ConfigError> {
        for (field, value) in [
            ("days_per_week", self.days_per_week),
            ("days_per_month", self.days_per_month),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive {
                    field,
                    provided: value,
                });
            }
        }
        if !self.behind_threshold.is_finite()
            || self.behind_threshold <= 0.0
            || self.behind_threshold > 1.0
        {
            return Err(ConfigError::InvalidBehindThreshold(self.behind_threshold));
        }
        Ok(self)
    }
}
