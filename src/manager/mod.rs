// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device update policies.
//!
//! An [`UpdateManager`] is bound to one device identity and answers the
//! questions a poll raises: is there an update, which firmware, how soon
//! should the device poll again. It also records the device's reported
//! state and installation log.
//!
//! Two policies exist:
//!
//! - [`DeviceUpdateManager`] for registered devices, backed by a persisted
//!   record
//! - [`UnknownUpdateManager`] for the reserved `"unknown"` identity, which
//!   persists nothing
//!
//! Managers are obtained from [`Updater::manager`](crate::Updater::manager).
//!
//! # Examples
//!
//! ```no_run
//! use fleet_updater::{HandlingType, MemoryStore, Updater, UpdaterConfig};
//!
//! # async fn example() -> fleet_updater::Result<()> {
//! let updater = Updater::new(MemoryStore::new(), UpdaterConfig::default());
//! let manager = updater.manager("3f1c2a9e").await;
//!
//! let (handling, firmware) = manager.get_update().await?;
//! if handling == HandlingType::Forced {
//!     println!("offer {:?}", firmware.map(|fw| fw.uri));
//! }
//! println!("next poll in {}s", manager.poll_seconds());
//!
//! manager.update_log(Some("Downloaded 12%")).await?;
//! # Ok(())
//! # }
//! ```

mod context;
mod device;
mod resolver;
mod unknown;

pub(crate) use context::UpdaterContext;
pub use device::DeviceUpdateManager;
pub use unknown::UnknownUpdateManager;

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::store::DeviceStore;
use crate::subscription::{LogCallback, LogSubscription};
use crate::types::{
    Device, Firmware, HandlingType, Hardware, PollTime, Rollout, UpdateMode, UpdateState,
};

/// Reserved identity for devices that have not identified themselves.
pub const UNKNOWN_DEVICE: &str = "unknown";

/// Update policy bound to one device identity.
///
/// State-changing operations on the unknown policy are no-ops.
pub enum UpdateManager<S> {
    /// A registered device.
    Device(DeviceUpdateManager<S>),
    /// The reserved `"unknown"` identity.
    Unknown(UnknownUpdateManager<S>),
}

impl<S: DeviceStore> UpdateManager<S> {
    /// Returns the device identity.
    #[must_use]
    pub fn uuid(&self) -> &str {
        match self {
            Self::Device(m) => m.uuid(),
            Self::Unknown(m) => m.uuid(),
        }
    }

    /// Returns true for the unknown-device policy.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    /// Returns the device record, or `None` for unknown devices.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn get_device(&self) -> Result<Option<Device>> {
        match self {
            Self::Device(m) => m.get_device().await.map(Some),
            Self::Unknown(_) => Ok(None),
        }
    }

    /// Decides what to offer the device on this poll.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn get_update(&self) -> Result<(HandlingType, Option<Firmware>)> {
        match self {
            Self::Device(m) => m.get_update().await,
            Self::Unknown(m) => m.get_update().await,
        }
    }

    /// Processes one line of the installation log.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_log(&self, line: Option<&str>) -> Result<()> {
        match self {
            Self::Device(m) => m.update_log(line).await,
            Self::Unknown(_) => Ok(()),
        }
    }

    /// Empties the installation log.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn clear_log(&self) -> Result<()> {
        match self {
            Self::Device(m) => m.clear_log().await,
            Self::Unknown(_) => Ok(()),
        }
    }

    /// Registers a log observer until the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails while loading the current log.
    pub async fn subscribe_log(&self, callback: LogCallback) -> Result<LogSubscription> {
        match self {
            Self::Device(m) => m.subscribe_log(callback).await,
            Self::Unknown(m) => Ok(m.subscribe_log(callback)),
        }
    }

    /// Runs `body` with `callback` subscribed to the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails while loading the current log.
    pub async fn watch_log<F: Future>(&self, callback: LogCallback, body: F) -> Result<F::Output> {
        match self {
            Self::Device(m) => m.watch_log(callback, body).await,
            Self::Unknown(m) => Ok(m.watch_log(callback, body).await),
        }
    }

    /// Returns the rollout governing the device, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn get_rollout(&self) -> Result<Option<Rollout>> {
        match self {
            Self::Device(m) => m.get_rollout().await,
            Self::Unknown(_) => Ok(None),
        }
    }

    /// Sets the one-shot forced update flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_force_update(&self, force_update: bool) -> Result<()> {
        match self {
            Self::Device(m) => m.update_force_update(force_update).await,
            Self::Unknown(_) => Ok(()),
        }
    }

    /// Records the firmware version reported by the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_fw_version(&self, version: &str) -> Result<()> {
        match self {
            Self::Device(m) => m.update_fw_version(version).await,
            Self::Unknown(_) => Ok(()),
        }
    }

    /// Changes the hardware class of the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_hardware(&self, hardware: Hardware) -> Result<()> {
        match self {
            Self::Device(m) => m.update_hardware(hardware).await,
            Self::Unknown(_) => Ok(()),
        }
    }

    /// Records a new update state.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_device_state(&self, state: UpdateState) -> Result<()> {
        match self {
            Self::Device(m) => m.update_device_state(state).await,
            Self::Unknown(_) => Ok(()),
        }
    }

    /// Records the time and source address of a poll.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_last_connection(&self, last_seen: DateTime<Utc>, ip: &str) -> Result<()> {
        match self {
            Self::Device(m) => m.update_last_connection(last_seen, ip).await,
            Self::Unknown(_) => Ok(()),
        }
    }

    /// Sets the update mode and assigned firmware.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_update(
        &self,
        update_mode: UpdateMode,
        firmware: Option<Firmware>,
    ) -> Result<()> {
        match self {
            Self::Device(m) => m.update_update(update_mode, firmware).await,
            Self::Unknown(_) => Ok(()),
        }
    }

    /// Sets the display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_name(&self, name: &str) -> Result<()> {
        match self {
            Self::Device(m) => m.update_name(name).await,
            Self::Unknown(_) => Ok(()),
        }
    }

    /// Applies configuration data sent by the device agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_config_data(&self, data: &HashMap<String, String>) -> Result<()> {
        match self {
            Self::Device(m) => m.update_config_data(data).await,
            Self::Unknown(_) => Ok(()),
        }
    }

    /// Marks whether the device finished sending its installation log.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_log_complete(&self, log_complete: bool) -> Result<()> {
        match self {
            Self::Device(m) => m.update_log_complete(log_complete).await,
            Self::Unknown(_) => Ok(()),
        }
    }

    /// Returns the interval the device should wait before polling again.
    #[must_use]
    pub fn poll_time(&self) -> PollTime {
        match self {
            Self::Device(m) => m.poll_time(),
            Self::Unknown(m) => m.poll_time(),
        }
    }

    /// Returns [`poll_time`](Self::poll_time) in seconds.
    #[must_use]
    pub fn poll_seconds(&self) -> u32 {
        self.poll_time().as_seconds()
    }
}

impl<S> std::fmt::Debug for UpdateManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Device(m) => f.debug_tuple("Device").field(m).finish(),
            Self::Unknown(m) => f.debug_tuple("Unknown").field(m).finish(),
        }
    }
}
