// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fleet telemetry reported by the update core.
//!
//! Each time a manager for a registered device is created, the current
//! device count is pushed to a [`DeviceCountGauge`]. Reporting is
//! best-effort and never fails the poll.

use std::sync::atomic::{AtomicU64, Ordering};

/// Sink for the total number of known devices.
pub trait DeviceCountGauge: Send + Sync {
    /// Records the current device count.
    fn set_device_count(&self, count: u64);
}

/// Gauge that discards every value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGauge;

impl DeviceCountGauge for NoopGauge {
    fn set_device_count(&self, _count: u64) {}
}

/// Gauge that keeps the last value in an atomic, for embedding or tests.
#[derive(Debug, Default)]
pub struct AtomicGauge(AtomicU64);

impl AtomicGauge {
    /// Creates a gauge reading zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last recorded value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl DeviceCountGauge for AtomicGauge {
    fn set_device_count(&self, count: u64) {
        self.0.store(count, Ordering::Relaxed);
    }
}

#[cfg(feature = "prometheus")]
impl DeviceCountGauge for prometheus::IntGauge {
    fn set_device_count(&self, count: u64) {
        self.set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_gauge_keeps_last_value() {
        let gauge = AtomicGauge::new();
        assert_eq!(gauge.get(), 0);

        gauge.set_device_count(12);
        gauge.set_device_count(7);
        assert_eq!(gauge.get(), 7);
    }

    #[test]
    fn noop_gauge_accepts_values() {
        NoopGauge.set_device_count(3);
    }

    #[cfg(feature = "prometheus")]
    #[test]
    fn prometheus_gauge() {
        let gauge = prometheus::IntGauge::new("devices_count", "Number of known devices").unwrap();
        gauge.set_device_count(42);
        assert_eq!(gauge.get(), 42);
    }
}
