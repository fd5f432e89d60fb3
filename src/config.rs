// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Updater configuration.

use std::time::Duration;

use crate::error::ConfigError;
use crate::types::PollTime;

/// Default time-to-live of cached device records.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Configuration for an [`Updater`](crate::Updater).
///
/// # Examples
///
/// ```
/// use fleet_updater::UpdaterConfig;
///
/// let config = UpdaterConfig::default();
/// assert_eq!(config.poll_time.as_seconds(), 60);
/// assert_eq!(config.poll_time_updating.as_seconds(), 5);
///
/// let config = UpdaterConfig::from_json(r#"{ "poll_time": "00:05:00" }"#).unwrap();
/// assert_eq!(config.poll_time.as_seconds(), 300);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Poll interval for devices with nothing to install.
    pub poll_time: PollTime,
    /// Poll interval while an update is being offered.
    pub poll_time_updating: PollTime,
    /// How long device records stay cached.
    #[serde(with = "duration_secs")]
    pub cache_ttl: Duration,
}

impl UpdaterConfig {
    /// Parses a configuration from JSON. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the document is malformed or a poll
    /// time is not a valid `HH:MM:SS` string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(Into::into)
    }

    /// Sets the idle poll interval.
    #[must_use]
    pub fn with_poll_time(mut self, poll_time: PollTime) -> Self {
        self.poll_time = poll_time;
        self
    }

    /// Sets the poll interval used while an update is offered.
    #[must_use]
    pub fn with_poll_time_updating(mut self, poll_time: PollTime) -> Self {
        self.poll_time_updating = poll_time;
        self
    }

    /// Sets the device cache time-to-live.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            poll_time: PollTime::from_hms(0, 1, 0).unwrap_or_default(),
            poll_time_updating: PollTime::from_hms(0, 0, 5).unwrap_or_default(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
