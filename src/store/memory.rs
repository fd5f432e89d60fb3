// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory [`DeviceStore`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::types::{Device, DeviceField, Firmware, Hardware, Rollout};

use super::DeviceStore;

#[derive(Debug, Default)]
struct Tables {
    next_id: u64,
    hardware: Vec<Hardware>,
    firmware: Vec<Firmware>,
    rollouts: Vec<Rollout>,
    devices: HashMap<String, Device>,
}

impl Tables {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// A [`DeviceStore`] backed by process memory.
///
/// Useful for tests and single-process deployments without a database.
///
/// # Examples
///
/// ```
/// use fleet_updater::MemoryStore;
///
/// # async fn example() -> fleet_updater::Result<()> {
/// let store = MemoryStore::new();
/// let hardware = store.hardware("board", "rev-a");
/// let firmware = store.add_firmware("2.0.0", "https://fw.example/2.0.0.swu", &[hardware]);
/// assert_eq!(firmware.version, "2.0.0");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the hardware class `(model, revision)`, creating it if absent.
    pub fn hardware(&self, model: &str, revision: &str) -> Hardware {
        let mut tables = self.tables.write();
        if let Some(existing) = tables
            .hardware
            .iter()
            .find(|hw| hw.model == model && hw.revision == revision)
        {
            return existing.clone();
        }

        let hardware = Hardware {
            id: tables.allocate_id(),
            model: model.to_string(),
            revision: revision.to_string(),
        };
        tables.hardware.push(hardware.clone());
        hardware
    }

    /// Adds a firmware image compatible with the given hardware classes.
    pub fn add_firmware(&self, version: &str, uri: &str, compatibility: &[Hardware]) -> Firmware {
        let mut tables = self.tables.write();
        let firmware = Firmware {
            id: tables.allocate_id(),
            uri: uri.to_string(),
            version: version.to_string(),
            compatibility: compatibility.to_vec(),
        };
        tables.firmware.push(firmware.clone());
        firmware
    }

    /// Adds a rollout of `firmware` created at `created_at`.
    pub fn add_rollout(
        &self,
        name: Option<&str>,
        firmware: &Firmware,
        created_at: DateTime<Utc>,
    ) -> Rollout {
        let mut tables = self.tables.write();
        let rollout = Rollout {
            id: tables.allocate_id(),
            name: name.map(str::to_string),
            firmware: firmware.clone(),
            paused: false,
            created_at,
        };
        tables.rollouts.push(rollout.clone());
        rollout
    }

    /// Pauses or resumes a rollout.
    ///
    /// Returns `false` if no rollout has that id.
    pub fn set_rollout_paused(&self, rollout_id: u64, paused: bool) -> bool {
        let mut tables = self.tables.write();
        match tables.rollouts.iter_mut().find(|r| r.id == rollout_id) {
            Some(rollout) => {
                rollout.paused = paused;
                true
            }
            None => false,
        }
    }

    /// Inserts or replaces a full device record.
    pub fn insert_device(&self, device: Device) {
        self.tables
            .write()
            .devices
            .insert(device.uuid.clone(), device);
    }

    /// Returns the persisted record of `uuid`, bypassing any cache.
    #[must_use]
    pub fn device(&self, uuid: &str) -> Option<Device> {
        self.tables.read().devices.get(uuid).cloned()
    }
}

impl DeviceStore for MemoryStore {
    async fn get_or_create_hardware(
        &self,
        model: &str,
        revision: &str,
    ) -> Result<Hardware, StoreError> {
        Ok(self.hardware(model, revision))
    }

    async fn get_or_create_device(
        &self,
        uuid: &str,
        default_hardware: &Hardware,
    ) -> Result<Device, StoreError> {
        let mut tables = self.tables.write();
        let device = tables
            .devices
            .entry(uuid.to_string())
            .or_insert_with(|| Device::new(uuid, default_hardware.clone()));
        Ok(device.clone())
    }

    async fn save_device(
        &self,
        device: &Device,
        fields: &[DeviceField],
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let stored = tables
            .devices
            .get_mut(&device.uuid)
            .ok_or_else(|| StoreError::Missing(format!("device {}", device.uuid)))?;

        for field in fields {
            field.copy(device, stored);
        }
        Ok(())
    }

    async fn delete_devices(&self, uuids: &[String]) -> Result<usize, StoreError> {
        let mut tables = self.tables.write();
        Ok(uuids
            .iter()
            .filter(|uuid| tables.devices.remove(uuid.as_str()).is_some())
            .count())
    }

    async fn count_devices(&self) -> Result<u64, StoreError> {
        Ok(self.tables.read().devices.len() as u64)
    }

    async fn latest_rollout(&self, device: &Device) -> Result<Option<Rollout>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .rollouts
            .iter()
            .filter(|r| r.firmware.is_compatible_with(&device.hardware))
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn latest_firmware(
        &self,
        hardware: Option<&Hardware>,
    ) -> Result<Option<Firmware>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .firmware
            .iter()
            .filter(|fw| hardware.is_none_or(|hw| fw.is_compatible_with(hw)))
            .max_by(|a, b| a.cmp_version(b))
            .cloned())
    }
}
