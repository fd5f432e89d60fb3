// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Update policy for registered devices.

use std::collections::HashMap;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::log_protocol::LogLine;
use crate::store::DeviceStore;
use crate::subscription::{LogCallback, LogSubscription};
use crate::types::{
    Device, DeviceField, Firmware, HandlingType, Hardware, PollTime, Rollout, UpdateMode,
    UpdateState,
};

use super::context::UpdaterContext;
use super::resolver;

/// Update manager bound to one registered device.
///
/// Reads go through the updater's device cache; every write refreshes the
/// cache entry before it is persisted.
///
/// State-changing calls for the same device must not run concurrently;
/// callers serialise them per device (many devices may proceed in parallel).
pub struct DeviceUpdateManager<S> {
    uuid: String,
    context: Arc<UpdaterContext<S>>,
}

impl<S: DeviceStore> DeviceUpdateManager<S> {
    pub(crate) fn new(uuid: impl Into<String>, context: Arc<UpdaterContext<S>>) -> Self {
        Self {
            uuid: uuid.into(),
            context,
        }
    }

    /// Returns the device identity.
    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    // =========================================================================
    // Device state access
    // =========================================================================

    /// Returns the device record, creating it on first access.
    ///
    /// New devices get the default hardware class.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn get_device(&self) -> Result<Device> {
        if let Some(device) = self.context.cache.get(&self.uuid) {
            return Ok(device);
        }

        let hardware = self.context.default_hardware().await?;
        let device = self
            .context
            .store
            .get_or_create_device(&self.uuid, hardware)
            .await?;
        self.context.cache.put(device.clone());
        Ok(device)
    }

    /// Refreshes the cache entry, then persists `fields` of `device`.
    async fn save_device(&self, device: Device, fields: &[DeviceField]) -> Result<()> {
        self.context.cache.put(device.clone());
        self.persist(&device, fields).await
    }

    /// Persists `fields` of an already cached `device`.
    ///
    /// If persisting fails the cache entry is dropped, so the next read
    /// reloads the stored record.
    async fn persist(&self, device: &Device, fields: &[DeviceField]) -> Result<()> {
        if let Err(e) = self.context.store.save_device(device, fields).await {
            tracing::warn!(device = %self.uuid, error = %e, ?fields, "Failed to persist device");
            self.context.cache.invalidate(&self.uuid);
            return Err(e.into());
        }
        Ok(())
    }

    /// Caches `device` and broadcasts `updates` as one step with respect to
    /// new log subscribers.
    fn publish_log(&self, device: &Device, updates: &[Option<&str>]) {
        let cached = device.clone();
        self.context.registry.publish_log_with(
            &self.uuid,
            || self.context.cache.put(cached),
            updates,
        );
    }

    /// Sets the one-shot forced update flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_force_update(&self, force_update: bool) -> Result<()> {
        let mut device = self.get_device().await?;
        device.force_update = force_update;
        self.save_device(device, &[DeviceField::ForceUpdate]).await
    }

    /// Records the firmware version reported by the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_fw_version(&self, version: &str) -> Result<()> {
        let mut device = self.get_device().await?;
        device.fw_version = Some(version.to_string());
        self.save_device(device, &[DeviceField::FwVersion]).await
    }

    /// Changes the hardware class of the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_hardware(&self, hardware: Hardware) -> Result<()> {
        let mut device = self.get_device().await?;
        device.hardware = hardware;
        self.save_device(device, &[DeviceField::Hardware]).await
    }

    /// Records a new update state.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_device_state(&self, state: UpdateState) -> Result<()> {
        let mut device = self.get_device().await?;
        tracing::debug!(device = %self.uuid, from = %device.last_state, to = %state, "Device state changed");
        device.last_state = state;
        self.save_device(device, &[DeviceField::LastState]).await
    }

    /// Records a poll: its time and the address the device connected from.
    ///
    /// IPv6 addresses are stored in `last_ipv6`, everything else in
    /// `last_ip`; the other address field is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_last_connection(&self, last_seen: DateTime<Utc>, ip: &str) -> Result<()> {
        let mut device = self.get_device().await?;
        device.last_seen = Some(last_seen);

        let is_ipv6 = match ip.parse::<IpAddr>() {
            Ok(addr) => addr.is_ipv6(),
            Err(_) => ip.contains(':'),
        };
        if is_ipv6 {
            device.last_ipv6 = Some(ip.to_string());
            self.save_device(device, &[DeviceField::LastSeen, DeviceField::LastIpv6]).await
        } else {
            device.last_ip = Some(ip.to_string());
            self.save_device(device, &[DeviceField::LastSeen, DeviceField::LastIp]).await
        }
    }

    /// Sets the update mode and the assigned firmware together.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_update(
        &self,
        update_mode: UpdateMode,
        firmware: Option<Firmware>,
    ) -> Result<()> {
        let mut device = self.get_device().await?;
        device.assigned_firmware = firmware;
        device.update_mode = update_mode;
        self.save_device(device, &[DeviceField::AssignedFirmware, DeviceField::UpdateMode]).await
    }

    /// Sets the display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_name(&self, name: &str) -> Result<()> {
        let mut device = self.get_device().await?;
        device.name = Some(name.to_string());
        self.save_device(device, &[DeviceField::Name]).await
    }

    /// Applies configuration data sent by the device agent.
    ///
    /// `hw_model` and `hw_revision` select the hardware class (missing or
    /// empty values mean `"default"`). A device still in
    /// [`UpdateState::Unknown`] becomes [`UpdateState::Registered`]. Nothing
    /// is written if neither changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_config_data(&self, data: &HashMap<String, String>) -> Result<()> {
        let field = |key: &str, fallback: &'static str| {
            data.get(key)
                .map(String::as_str)
                .filter(|value| !value.is_empty())
                .unwrap_or(fallback)
        };
        let model = field("hw_model", Hardware::DEFAULT_MODEL);
        let revision = field("hw_revision", Hardware::DEFAULT_REVISION);

        let hardware = self
            .context
            .store
            .get_or_create_hardware(model, revision)
            .await?;
        let mut device = self.get_device().await?;
        let mut modified = false;

        if device.hardware != hardware {
            device.hardware = hardware;
            modified = true;
        }
        if device.last_state == UpdateState::Unknown {
            device.last_state = UpdateState::Registered;
            modified = true;
        }

        if modified {
            tracing::debug!(device = %self.uuid, model, revision, "Device configuration updated");
            self.save_device(device, &[DeviceField::Hardware, DeviceField::LastState]).await?;
        }
        Ok(())
    }

    /// Marks whether the device finished sending its installation log.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_log_complete(&self, log_complete: bool) -> Result<()> {
        let mut device = self.get_device().await?;
        device.log_complete = log_complete;
        self.save_device(device, &[DeviceField::LogComplete]).await
    }

    /// Returns the rollout governing this device, if it is in rollout mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn get_rollout(&self) -> Result<Option<Rollout>> {
        let device = self.get_device().await?;
        Ok(resolver::bound_rollout(&self.context.store, &device).await?)
    }

    // =========================================================================
    // Update decision
    // =========================================================================

    /// Decides what to offer the device on this poll.
    ///
    /// The firmware is returned even when the outcome is
    /// [`HandlingType::Skip`] because the device already runs it. The poll
    /// interval is updated as part of the decision.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn get_update(&self) -> Result<(HandlingType, Option<Firmware>)> {
        let device = self.get_device().await?;
        let firmware = resolver::candidate_firmware(&self.context.store, &device).await?;
        let config = &self.context.config;

        let handling = match &firmware {
            None => {
                tracing::debug!(device = %self.uuid, mode = %device.update_mode, "No firmware candidate");
                HandlingType::Skip
            }
            Some(fw)
                if device.fw_version.as_deref() == Some(fw.version.as_str())
                    && !device.force_update =>
            {
                tracing::debug!(device = %self.uuid, version = %fw.version, "Device is up to date");
                HandlingType::Skip
            }
            Some(_) if device.last_state == UpdateState::Error && !device.force_update => {
                tracing::debug!(device = %self.uuid, "Skipping update after failed attempt");
                HandlingType::Skip
            }
            Some(fw) => {
                tracing::info!(
                    device = %self.uuid,
                    version = %fw.version,
                    forced = device.force_update,
                    "Offering update"
                );
                HandlingType::Forced
            }
        };

        if handling == HandlingType::Forced {
            self.context.set_poll_time(&self.uuid, config.poll_time_updating);

            if device.log_complete {
                self.update_log_complete(false).await?;
                self.clear_log().await?;
            }
        } else {
            self.context.set_poll_time(&self.uuid, config.poll_time);
        }

        Ok((handling, firmware))
    }

    // =========================================================================
    // Installation log
    // =========================================================================

    /// Processes one line of the device's installation log.
    ///
    /// Updates the download progress, resets the log when a new installation
    /// starts, appends the line and broadcasts it to subscribers. `None` is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_log(&self, line: Option<&str>) -> Result<()> {
        let Some(line) = line else {
            return Ok(());
        };
        let mut device = self.get_device().await?;
        let parsed = LogLine::parse(line);
        let entry = format!("{line}\n");
        let mut updates = Vec::with_capacity(2);

        if let Some(progress) = parsed.progress {
            device.progress = Some(progress);
        }

        if parsed.resets_log {
            device.last_log = Some(String::new());
            updates.push(None);
        }

        if parsed.recorded {
            device
                .last_log
                .get_or_insert_with(String::new)
                .push_str(&entry);
            updates.push(Some(entry.as_str()));
        }

        self.publish_log(&device, &updates);
        self.persist(&device, &[DeviceField::Progress, DeviceField::LastLog]).await
    }

    /// Empties the installation log and tells subscribers to clear their
    /// view.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn clear_log(&self) -> Result<()> {
        let mut device = self.get_device().await?;
        device.last_log = Some(String::new());
        self.publish_log(&device, &[None]);
        self.persist(&device, &[DeviceField::LastLog]).await
    }

    /// Registers a log observer.
    ///
    /// The callback immediately receives the current log, then every
    /// subsequent update until the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails while loading the current log.
    pub async fn subscribe_log(&self, callback: LogCallback) -> Result<LogSubscription> {
        let loaded = self.get_device().await?.last_log;
        let cache = &self.context.cache;
        Ok(self.context.subscribe(&self.uuid, callback, || {
            cache.get(&self.uuid).map_or(loaded, |device| device.last_log)
        }))
    }

    /// Runs `body` with `callback` subscribed to the log.
    ///
    /// The callback is unregistered when `body` completes or when the
    /// returned future is dropped before completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails while loading the current log.
    pub async fn watch_log<F: Future>(&self, callback: LogCallback, body: F) -> Result<F::Output> {
        let _subscription = self.subscribe_log(callback).await?;
        Ok(body.await)
    }

    // =========================================================================
    // Poll interval
    // =========================================================================

    /// Returns the interval the device should wait before polling again.
    #[must_use]
    pub fn poll_time(&self) -> PollTime {
        self.context.poll_time(&self.uuid)
    }

    /// Returns [`poll_time`](Self::poll_time) in seconds.
    #[must_use]
    pub fn poll_seconds(&self) -> u32 {
        self.poll_time().as_seconds()
    }
}

impl<S> std::fmt::Debug for DeviceUpdateManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceUpdateManager")
            .field("uuid", &self.uuid)
            .finish_non_exhaustive()
    }
}
