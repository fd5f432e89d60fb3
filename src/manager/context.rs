// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State shared by every manager created from one updater.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::cache::DeviceCache;
use crate::config::UpdaterConfig;
use crate::error::StoreError;
use crate::registry::DeviceRegistry;
use crate::store::DeviceStore;
use crate::subscription::{LogCallback, LogSubscription};
use crate::telemetry::DeviceCountGauge;
use crate::types::{Hardware, PollTime};

pub(crate) struct UpdaterContext<S> {
    pub store: S,
    pub config: UpdaterConfig,
    pub cache: DeviceCache,
    pub registry: Arc<DeviceRegistry>,
    pub gauge: Arc<dyn DeviceCountGauge>,
    default_hardware: OnceCell<Hardware>,
}

impl<S: DeviceStore> UpdaterContext<S> {
    pub fn new(
        store: S,
        config: UpdaterConfig,
        registry: Arc<DeviceRegistry>,
        gauge: Arc<dyn DeviceCountGauge>,
    ) -> Self {
        Self {
            store,
            cache: DeviceCache::new(config.cache_ttl),
            config,
            registry,
            gauge,
            default_hardware: OnceCell::new(),
        }
    }

    /// Hardware class assigned to devices created on first poll.
    ///
    /// Looked up once; later calls reuse the stored record.
    pub async fn default_hardware(&self) -> Result<&Hardware, StoreError> {
        self.default_hardware
            .get_or_try_init(|| {
                self.store
                    .get_or_create_hardware(Hardware::DEFAULT_MODEL, Hardware::DEFAULT_REVISION)
            })
            .await
    }

    pub fn poll_time(&self, uuid: &str) -> PollTime {
        self.registry.poll_time(uuid).unwrap_or(self.config.poll_time)
    }

    pub fn set_poll_time(&self, uuid: &str, value: PollTime) {
        self.registry.set_poll_time(uuid, value, self.config.poll_time);
    }

    /// Registers `callback`; `initial` is read under the registry lock.
    pub fn subscribe(
        &self,
        uuid: &str,
        callback: LogCallback,
        initial: impl FnOnce() -> Option<String>,
    ) -> LogSubscription {
        let id = self.registry.add_log_subscriber(uuid, callback, initial);
        LogSubscription::new(Arc::clone(&self.registry), uuid.to_string(), id)
    }
}
