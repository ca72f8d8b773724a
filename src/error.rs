use thiserror::Error;

/// Rejected configuration values. Out-of-range values are never clamped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("config value out of range: {field}={value}, expected {expected}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
    #[error("config value is not a finite number: {field}")]
    NotFinite { field: &'static str },
}

impl ConfigError {
    pub(crate) fn out_of_range(field: &'static str, value: f64, expected: &'static str) -> Self {
        Self::OutOfRange {
            field,
            value,
            expected,
        }
    }
}

/// Platform notification failures. Always recovered inside the fatigue engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("notification permission denied")]
    PermissionDenied,
    #[error("notifications are not supported on this platform")]
    Unsupported,
    #[error("notification dispatch failed: {0}")]
    Dispatch(String),
}

/// Check that `value` is finite and within `[min, max]`.
pub(crate) fn check_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
    expected: &'static str,
) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { field });
    }
    if value < min || value > max {
        return Err(ConfigError::out_of_range(field, value, expected));
    }
    Ok(())
}
