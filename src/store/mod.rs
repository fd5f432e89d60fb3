// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persistence collaborator for the update core.
//!
//! The update core never owns storage. It needs a small set of operations
//! from whatever database backs the service, described by [`DeviceStore`].
//! [`MemoryStore`] implements them in process memory.

mod memory;

pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::types::{Device, DeviceField, Firmware, Hardware, Rollout};

/// Operations the update core needs from persistent storage.
#[allow(async_fn_in_trait)]
pub trait DeviceStore {
    /// Returns the hardware class `(model, revision)`, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    async fn get_or_create_hardware(
        &self,
        model: &str,
        revision: &str,
    ) -> Result<Hardware, StoreError>;

    /// Returns the device `uuid`, creating it with `default_hardware` if
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    async fn get_or_create_device(
        &self,
        uuid: &str,
        default_hardware: &Hardware,
    ) -> Result<Device, StoreError>;

    /// Persists exactly the listed fields of `device`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    async fn save_device(&self, device: &Device, fields: &[DeviceField])
    -> Result<(), StoreError>;

    /// Deletes every device whose identity is in `uuids`.
    ///
    /// Returns the number of deleted records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    async fn delete_devices(&self, uuids: &[String]) -> Result<usize, StoreError>;

    /// Returns the total number of devices.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    async fn count_devices(&self) -> Result<u64, StoreError>;

    /// Returns the most recently created rollout whose firmware is
    /// compatible with the hardware of `device`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    async fn latest_rollout(&self, device: &Device) -> Result<Option<Rollout>, StoreError>;

    /// Returns the highest-ordered firmware compatible with `hardware`, or
    /// with any hardware when `hardware` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    async fn latest_firmware(
        &self,
        hardware: Option<&Hardware>,
    ) -> Result<Option<Firmware>, StoreError>;
}

impl<T: DeviceStore> DeviceStore for std::sync::Arc<T> {
    async fn get_or_create_hardware(
        &self,
        model: &str,
        revision: &str,
    ) -> Result<Hardware, StoreError> {
        (**self).get_or_create_hardware(model, revision).await
    }

    async fn get_or_create_device(
        &self,
        uuid: &str,
        default_hardware: &Hardware,
    ) -> Result<Device, StoreError> {
        (**self).get_or_create_device(uuid, default_hardware).await
    }

    async fn save_device(
        &self,
        device: &Device,
        fields: &[DeviceField],
    ) -> Result<(), StoreError> {
        (**self).save_device(device, fields).await
    }

    async fn delete_devices(&self, uuids: &[String]) -> Result<usize, StoreError> {
        (**self).delete_devices(uuids).await
    }

    async fn count_devices(&self) -> Result<u64, StoreError> {
        (**self).count_devices().await
    }

    async fn latest_rollout(&self, device: &Device) -> Result<Option<Rollout>, StoreError> {
        (**self).latest_rollout(device).await
    }

    async fn latest_firmware(
        &self,
        hardware: Option<&Hardware>,
    ) -> Result<Option<Firmware>, StoreError> {
        (**self).latest_firmware(hardware).await
    }
}
