// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Update policy for devices that have not identified themselves.

use std::future::Future;
use std::sync::Arc;

use crate::error::Result;
use crate::store::DeviceStore;
use crate::subscription::{LogCallback, LogSubscription};
use crate::types::{Firmware, HandlingType, PollTime};

use super::UNKNOWN_DEVICE;
use super::context::UpdaterContext;

/// Update manager for the reserved `"unknown"` identity.
///
/// Nothing is persisted for unknown devices. They are always offered the
/// newest firmware regardless of hardware, and always poll at the
/// updating interval.
pub struct UnknownUpdateManager<S> {
    context: Arc<UpdaterContext<S>>,
}

impl<S: DeviceStore> UnknownUpdateManager<S> {
    pub(crate) fn new(context: Arc<UpdaterContext<S>>) -> Self {
        let poll_time = context.config.poll_time_updating;
        context.set_poll_time(UNKNOWN_DEVICE, poll_time);
        Self { context }
    }

    /// Returns the reserved identity.
    #[must_use]
    pub fn uuid(&self) -> &str {
        UNKNOWN_DEVICE
    }

    /// Always forces the newest firmware known to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn get_update(&self) -> Result<(HandlingType, Option<Firmware>)> {
        let firmware = self.context.store.latest_firmware(None).await?;
        Ok((HandlingType::Forced, firmware))
    }

    /// Registers a log observer. It receives an empty initial log and no
    /// further updates, since unknown devices keep no log.
    #[must_use = "the subscription ends as soon as the guard is dropped"]
    pub fn subscribe_log(&self, callback: LogCallback) -> LogSubscription {
        self.context.subscribe(UNKNOWN_DEVICE, callback, || None)
    }

    /// Runs `body` with `callback` subscribed to the (empty) log.
    pub async fn watch_log<F: Future>(&self, callback: LogCallback, body: F) -> F::Output {
        let _subscription = self.subscribe_log(callback);
        body.await
    }

    /// Returns the interval the device should wait before polling again.
    #[must_use]
    pub fn poll_time(&self) -> PollTime {
        self.context.poll_time(UNKNOWN_DEVICE)
    }

    /// Returns [`poll_time`](Self::poll_time) in seconds.
    #[must_use]
    pub fn poll_seconds(&self) -> u32 {
        self.poll_time().as_seconds()
    }
}

impl<S> std::fmt::Debug for UnknownUpdateManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnknownUpdateManager").finish_non_exhaustive()
    }
}
