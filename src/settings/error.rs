//! Settings store error types.
//!
//! Only invalid user input reaches callers. Storage failures are logged by the
//! store and never abort an operation.

use thiserror::Error;

/// Errors that can occur in the settings store.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A value outside its allowed range.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Storage key of the rejected value
        key: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// Reading or writing the backing file failed.
    #[error("settings file error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding the settings failed.
    #[error("failed to encode settings: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The home directory could not be determined.
    #[error("home directory not found")]
    HomeDirectoryNotFound,
}

impl SettingsError {
    /// Creates an invalid value error.
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            reason: reason.into(),
        }
    }

    /// Returns true if the error was caused by user input.
    #[must_use]
    pub fn is_invalid_value(&self) -> bool {
        matches!(self, Self::InvalidValue { .. })
    }
}

/// Result type alias using `SettingsError`.
pub type Result<T> = std::result::Result<T, SettingsError>;
