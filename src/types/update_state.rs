// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device update state and update mode enumerations.

use std::fmt;

/// Last update state reported by (or inferred for) a device.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum UpdateState {
    /// Device has polled but never sent its configuration data.
    #[default]
    Unknown,
    /// Device sent configuration data and is known to the server.
    Registered,
    /// Device is running normally.
    Running,
    /// An update is in progress.
    Updating,
    /// The last update finished successfully.
    Finished,
    /// The last update failed.
    Error,
}

impl UpdateState {
    /// Returns the lowercase name used in persistence and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Registered => "registered",
            Self::Running => "running",
            Self::Updating => "updating",
            Self::Finished => "finished",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the server selects firmware for a device.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// The device manages its own firmware; the server never offers one.
    Pinned,
    /// Always offer the newest firmware compatible with the hardware.
    Latest,
    /// Offer the firmware explicitly assigned to the device.
    Assigned,
    /// Follow the most recent rollout matching the device hardware.
    #[default]
    Rollout,
}

impl UpdateMode {
    /// Returns the lowercase name used in persistence and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pinned => "pinned",
            Self::Latest => "latest",
            Self::Assigned => "assigned",
            Self::Rollout => "rollout",
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency of the update offered to a device on a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlingType {
    /// Nothing to do.
    Skip,
    /// Update is offered; the device may defer it.
    Attempt,
    /// Update must be installed now.
    Forced,
}

impl HandlingType {
    /// Returns the lowercase name sent to device agents.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Attempt => "attempt",
            Self::Forced => "forced",
        }
    }
}

impl fmt::Display for HandlingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
