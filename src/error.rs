// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the update decision core.
//!
//! Missing devices, firmware and rollouts are not errors at this layer:
//! devices are created on demand and absent firmware or rollouts simply
//! yield no update candidate. What remains are persistence failures, which
//! are passed through from the [`DeviceStore`](crate::store::DeviceStore),
//! and configuration errors.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The persistence backend failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration could not be parsed or is invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors reported by a [`DeviceStore`](crate::store::DeviceStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend is unreachable or refused the operation.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A record referenced by the operation no longer exists.
    #[error("record not found: {0}")]
    Missing(String),

    /// Any other backend failure.
    #[error(transparent)]
    Backend(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors related to configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A poll time string is not a valid `HH:MM:SS` time of day.
    #[error("invalid poll time {value:?}: {message}")]
    InvalidPollTime {
        /// The rejected input.
        value: String,
        /// Description of the parsing failure.
        message: String,
    },

    /// JSON configuration could not be parsed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_time_error_display() {
        let err = ConfigError::InvalidPollTime {
            value: "25:00:00".to_string(),
            message: "hour out of range".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid poll time \"25:00:00\": hour out of range"
        );
    }

    #[test]
    fn error_from_store_error() {
        let err: Error = StoreError::Unavailable("connection refused".to_string()).into();
        assert!(matches!(err, Error::Store(StoreError::Unavailable(_))));
        assert_eq!(
            err.to_string(),
            "store error: backend unavailable: connection refused"
        );
    }

    #[test]
    fn backend_error_is_transparent() {
        let source: Box<dyn std::error::Error + Send + Sync> = "disk full".into();
        let err = StoreError::from(source);
        assert_eq!(err.to_string(), "disk full");
    }
}
