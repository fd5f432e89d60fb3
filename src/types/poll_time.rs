// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Poll interval expressed as a time of day.
//!
//! Devices are told how long to wait before polling again. The interval is
//! configured as an `HH:MM:SS` string (e.g. `"00:01:00"`) and handed to the
//! transport layer as a number of seconds.
//!
//! # Examples
//!
//! ```
//! use fleet_updater::types::PollTime;
//!
//! let poll: PollTime = "00:01:30".parse().unwrap();
//! assert_eq!(poll.as_seconds(), 90);
//! assert_eq!(poll.to_string(), "00:01:30");
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveTime, Timelike};

use crate::error::ConfigError;

const FORMAT: &str = "%H:%M:%S";

/// A polling interval between `00:00:00` and `23:59:59`.
///
/// The default is `00:00:00`, i.e. poll again immediately.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct PollTime(NaiveTime);

impl PollTime {
    /// Creates a poll time from hours, minutes and seconds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPollTime`] if any component is out of
    /// range for a time of day.
    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Result<Self, ConfigError> {
        NaiveTime::from_hms_opt(hours, minutes, seconds)
            .map(Self)
            .ok_or_else(|| ConfigError::InvalidPollTime {
                value: format!("{hours:02}:{minutes:02}:{seconds:02}"),
                message: "component out of range".to_string(),
            })
    }

    /// Returns the total number of seconds in the interval.
    #[must_use]
    pub fn as_seconds(&self) -> u32 {
        self.0.hour() * 3600 + self.0.minute() * 60 + self.0.second()
    }

    /// Returns the interval as a [`Duration`].
    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.as_seconds()))
    }
}

impl FromStr for PollTime {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), FORMAT)
            .map(Self)
            .map_err(|e| ConfigError::InvalidPollTime {
                value: s.to_string(),
                message: e.to_string(),
            })
    }
}

impl TryFrom<String> for PollTime {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PollTime> for String {
    fn from(value: PollTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PollTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(FORMAT))
    }
}
