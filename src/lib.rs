// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fleet Updater - the device-facing decision core of a firmware update
//! (OTA) service.
//!
//! For every device poll this library decides whether an update should be
//! offered, which firmware, and how urgently. It also tracks device state,
//! aggregates and live-streams installation logs, and shortens the polling
//! interval while an update is in flight.
//!
//! HTTP routing, authentication, artifact storage and the database schema
//! are left to the surrounding service. Storage is reached through the
//! [`DeviceStore`] trait.
//!
//! # Decision Order
//!
//! On each poll of a registered device:
//!
//! 1. The firmware candidate is resolved from the update mode
//!    (pinned, latest, assigned or rollout)
//! 2. No candidate: skip
//! 3. Candidate already installed and no forced update: skip
//! 4. Last update failed and no forced update: skip
//! 5. Otherwise: forced update, and the device polls at the faster
//!    updating interval
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use fleet_updater::{MemoryStore, Updater, UpdaterConfig};
//!
//! #[tokio::main]
//! async fn main() -> fleet_updater::Result<()> {
//!     let config = UpdaterConfig::from_json(r#"{ "poll_time": "00:02:00" }"#)?;
//!     let updater = Updater::new(MemoryStore::new(), config);
//!
//!     // A device polls
//!     let manager = updater.manager("3f1c2a9e").await;
//!     let (handling, firmware) = manager.get_update().await?;
//!     println!("{handling}: {firmware:?}, next poll in {}s", manager.poll_seconds());
//!
//!     // A UI follows its installation log
//!     let _subscription = manager
//!         .subscribe_log(Arc::new(|update: Option<&str>| {
//!             if let Some(text) = update {
//!                 print!("{text}");
//!             }
//!         }))
//!         .await?;
//!
//!     // The device reports progress
//!     manager.update_log(Some("Downloaded 40%")).await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod log_protocol;
pub mod manager;
pub mod registry;
pub mod store;
pub mod subscription;
pub mod telemetry;
pub mod types;
mod updater;

pub use config::UpdaterConfig;
pub use error::{ConfigError, Error, Result, StoreError};
pub use manager::{DeviceUpdateManager, UNKNOWN_DEVICE, UnknownUpdateManager, UpdateManager};
pub use registry::DeviceRegistry;
pub use store::{DeviceStore, MemoryStore};
pub use subscription::{LogCallback, LogSubscription, SubscriptionId};
pub use types::{
    Device, DeviceField, Firmware, HandlingType, Hardware, PollTime, Rollout, UpdateMode,
    UpdateState,
};
pub use updater::{Updater, UpdaterBuilder};
