// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Live observation of device installation logs.
//!
//! Observers (for example a UI streaming a device's log) register a
//! [`LogCallback`] for one device. On registration they receive the log
//! accumulated so far, then every line appended after it, and a clear
//! signal whenever the device starts a new installation.
//!
//! # Overview
//!
//! - [`SubscriptionId`] - Identifies one registered callback
//! - [`LogCallback`] - The callback type
//! - [`LogSubscription`] - Scope guard; dropping it unregisters the callback
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use fleet_updater::{MemoryStore, Updater, UpdaterConfig};
//!
//! # async fn example() -> fleet_updater::Result<()> {
//! let updater = Updater::new(MemoryStore::new(), UpdaterConfig::default());
//! let manager = updater.manager("device-1").await;
//!
//! let subscription = manager
//!     .subscribe_log(Arc::new(|update: Option<&str>| match update {
//!         Some(text) => print!("{text}"),
//!         None => println!("-- log cleared --"),
//!     }))
//!     .await?;
//!
//! // ... stream until the client disconnects ...
//! drop(subscription);
//! # Ok(())
//! # }
//! ```

mod callback;
mod guard;

pub use callback::{LogCallback, SubscriptionId};
pub use guard::LogSubscription;
