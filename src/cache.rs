// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process cache of device records.
//!
//! Every poll reads the device record, so reads are served from memory for
//! a fixed time-to-live. Writers refresh the entry before persisting
//! (write-through), so a read in the same process always observes the last
//! write. Other processes sharing the store may see stale values for up to
//! one TTL.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::types::Device;

#[derive(Debug)]
struct Entry {
    device: Device,
    expires_at: Instant,
}

/// Time-bounded cache of [`Device`] records keyed by device identity.
#[derive(Debug)]
pub struct DeviceCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl DeviceCache {
    /// Creates an empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the configured time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns a copy of the cached record, if present and not expired.
    ///
    /// Expired entries are dropped on access.
    #[must_use]
    pub fn get(&self, uuid: &str) -> Option<Device> {
        let mut entries = self.entries.lock();
        match entries.get(uuid) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.device.clone()),
            Some(_) => {
                entries.remove(uuid);
                None
            }
            None => None,
        }
    }

    /// Stores `device` under its identity, restarting the TTL.
    ///
    /// Expired entries of every device are dropped first.
    pub fn put(&self, device: Device) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            device.uuid.clone(),
            Entry {
                device,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Removes the entry for `uuid`.
    ///
    /// Returns `true` if an entry (expired or not) was present.
    pub fn invalidate(&self, uuid: &str) -> bool {
        self.entries.lock().remove(uuid).is_some()
    }

    /// Returns the number of stored entries, including expired ones not yet
    /// evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Hardware;

    fn device(uuid: &str) -> Device {
        Device::new(
            uuid,
            Hardware {
                id: 1,
                model: "default".to_string(),
                revision: "default".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn get_after_put() {
        let cache = DeviceCache::new(Duration::from_secs(600));
        cache.put(device("a"));

        assert_eq!(cache.get("a").unwrap().uuid, "a");
        assert!(cache.get("b").is_none());
    }

    #[tokio::test]
    async fn put_replaces_value() {
        let cache = DeviceCache::new(Duration::from_secs(600));
        cache.put(device("a"));

        let mut updated = device("a");
        updated.fw_version = Some("2.0".to_string());
        cache.put(updated);

        assert_eq!(cache.get("a").unwrap().fw_version.as_deref(), Some("2.0"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = DeviceCache::new(Duration::from_secs(600));
        cache.put(device("a"));

        tokio::time::advance(Duration::from_secs(599)).await;
        assert!(cache.get("a").is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn put_restarts_ttl() {
        let cache = DeviceCache::new(Duration::from_secs(10));
        cache.put(device("a"));

        tokio::time::advance(Duration::from_secs(8)).await;
        cache.put(device("a"));

        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(cache.get("a").is_some());
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let cache = DeviceCache::new(Duration::from_secs(600));
        cache.put(device("a"));

        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert!(cache.get("a").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn put_evicts_expired_entries_of_other_devices() {
        let cache = DeviceCache::new(Duration::from_secs(10));
        cache.put(device("idle"));
        cache.put(device("active"));

        tokio::time::advance(Duration::from_secs(11)).await;
        cache.put(device("active"));

        assert_eq!(cache.len(), 1);
        assert!(cache.get("idle").is_none());
        assert!(cache.get("active").is_some());
    }
}
