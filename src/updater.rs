// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entry point of the update core.

use std::sync::Arc;

use crate::cache::DeviceCache;
use crate::config::UpdaterConfig;
use crate::error::Result;
use crate::manager::{
    DeviceUpdateManager, UNKNOWN_DEVICE, UnknownUpdateManager, UpdateManager, UpdaterContext,
};
use crate::registry::DeviceRegistry;
use crate::store::DeviceStore;
use crate::telemetry::{DeviceCountGauge, NoopGauge};

/// Hands out update managers and owns the state they share.
///
/// One `Updater` is created at startup. It holds the store, the device
/// cache and the [`DeviceRegistry`]; cloning it is cheap and every clone
/// shares the same state.
///
/// # Examples
///
/// ```
/// use fleet_updater::{HandlingType, MemoryStore, UpdateMode, Updater, UpdaterConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> fleet_updater::Result<()> {
/// let store = MemoryStore::new();
/// let board = store.hardware("default", "default");
/// store.add_firmware("2.0", "https://fw.example/2.0.swu", &[board]);
///
/// let updater = Updater::new(store, UpdaterConfig::default());
/// let manager = updater.manager("device-1").await;
/// manager.update_update(UpdateMode::Latest, None).await?;
/// manager.update_fw_version("1.0").await?;
///
/// let (handling, firmware) = manager.get_update().await?;
/// assert_eq!(handling, HandlingType::Forced);
/// assert_eq!(firmware.unwrap().version, "2.0");
/// assert_eq!(manager.poll_seconds(), 5);
/// # Ok(())
/// # }
/// ```
pub struct Updater<S> {
    context: Arc<UpdaterContext<S>>,
}

impl<S: DeviceStore> Updater<S> {
    /// Creates an updater with a fresh registry and no telemetry.
    #[must_use]
    pub fn new(store: S, config: UpdaterConfig) -> Self {
        Self::builder(store).config(config).build()
    }

    /// Starts building an updater around `store`.
    #[must_use]
    pub fn builder(store: S) -> UpdaterBuilder<S> {
        UpdaterBuilder::new(store)
    }

    /// Returns the update manager for `uuid`.
    ///
    /// The reserved identity [`UNKNOWN_DEVICE`] gets the unknown-device
    /// policy. For every other identity the current device count is
    /// reported to the telemetry gauge first; a failing count is ignored.
    pub async fn manager(&self, uuid: &str) -> UpdateManager<S> {
        if uuid == UNKNOWN_DEVICE {
            return UpdateManager::Unknown(UnknownUpdateManager::new(Arc::clone(&self.context)));
        }

        match self.context.store.count_devices().await {
            Ok(count) => self.context.gauge.set_device_count(count),
            Err(e) => tracing::debug!(error = %e, "Could not count devices for telemetry"),
        }
        UpdateManager::Device(DeviceUpdateManager::new(uuid, Arc::clone(&self.context)))
    }

    /// Deletes devices and forgets everything held for them in memory.
    ///
    /// Returns the number of records removed from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails. Cache and registry entries are
    /// only dropped after the store deletion succeeded.
    pub async fn delete_devices(&self, uuids: &[String]) -> Result<usize> {
        let deleted = self.context.store.delete_devices(uuids).await?;
        for uuid in uuids {
            self.context.cache.invalidate(uuid);
            self.context.registry.remove_device(uuid);
        }
        tracing::info!(requested = uuids.len(), deleted, "Deleted devices");
        Ok(deleted)
    }

    /// Returns the persistence backend.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.context.store
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &UpdaterConfig {
        &self.context.config
    }

    /// Returns the device record cache.
    #[must_use]
    pub fn cache(&self) -> &DeviceCache {
        &self.context.cache
    }

    /// Returns the device-keyed side state.
    #[must_use]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.context.registry
    }
}

impl<S> Clone for Updater<S> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
        }
    }
}

impl<S> std::fmt::Debug for Updater<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("config", &self.context.config)
            .field("registry", &self.context.registry)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Updater`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use fleet_updater::{MemoryStore, Updater, UpdaterConfig};
/// use fleet_updater::telemetry::AtomicGauge;
///
/// let gauge = Arc::new(AtomicGauge::new());
/// let updater = Updater::builder(MemoryStore::new())
///     .config(UpdaterConfig::default())
///     .gauge(gauge.clone())
///     .build();
/// ```
pub struct UpdaterBuilder<S> {
    store: S,
    config: UpdaterConfig,
    registry: Option<Arc<DeviceRegistry>>,
    gauge: Arc<dyn DeviceCountGauge>,
}

impl<S: DeviceStore> UpdaterBuilder<S> {
    fn new(store: S) -> Self {
        Self {
            store,
            config: UpdaterConfig::default(),
            registry: None,
            gauge: Arc::new(NoopGauge),
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: UpdaterConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares an existing registry instead of creating a new one.
    #[must_use]
    pub fn registry(mut self, registry: Arc<DeviceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the gauge receiving the device count.
    #[must_use]
    pub fn gauge(mut self, gauge: Arc<dyn DeviceCountGauge>) -> Self {
        self.gauge = gauge;
        self
    }

    /// Builds the updater.
    #[must_use]
    pub fn build(self) -> Updater<S> {
        let registry = self.registry.unwrap_or_default();
        Updater {
            context: Arc::new(UpdaterContext::new(
                self.store,
                self.config,
                registry,
                self.gauge,
            )),
        }
    }
}
