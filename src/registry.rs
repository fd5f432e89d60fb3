// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process-wide, device-keyed side state.
//!
//! The [`DeviceRegistry`] holds what the update core tracks per device
//! besides the persisted record:
//!
//! - log subscribers, notified as installation log lines arrive
//! - poll interval overrides, set while an update is being offered
//!
//! Neither survives a restart. Entries are pruned when devices are deleted
//! and poll overrides are dropped as soon as they return to the default.
//!
//! # Architecture
//!
//! ```text
//! DeviceUpdateManager.update_log("Downloaded 10%")
//!                     ↓
//!       registry.publish_log(uuid, Some("Downloaded 10%\n"))
//!                     ↓
//!   refresh cached record + snapshot subscribers of uuid (one read lock)
//!                     ↓
//!           callback(Some("Downloaded 10%\n")) for each
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::subscription::{LogCallback, SubscriptionId};
use crate::types::PollTime;

/// A registered callback.
///
/// `delivery` is held while the callback runs, so one subscriber never sees
/// two deliveries at once and its initial delivery precedes every broadcast.
struct Subscriber {
    id: SubscriptionId,
    callback: LogCallback,
    delivery: Mutex<()>,
}

type Subscribers = Arc<[Arc<Subscriber>]>;

/// Device-keyed tables shared by every update manager in the process.
///
/// Subscriber lists are replaced as a whole on every change, so a failed or
/// concurrent update never leaves a partially modified list behind.
pub struct DeviceRegistry {
    next_id: AtomicU64,
    log_subscribers: RwLock<HashMap<String, Subscribers>>,
    poll_times: RwLock<HashMap<String, PollTime>>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            log_subscribers: RwLock::new(HashMap::new()),
            poll_times: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Log subscribers
    // =========================================================================

    /// Registers `callback` for the log of `uuid` and delivers the value
    /// returned by `initial`.
    ///
    /// `initial` runs under the table lock, so it observes either the state
    /// before a concurrent [`publish_log_with`](Self::publish_log_with) (and
    /// the subscriber then receives that broadcast) or the state after it.
    /// The delivery itself happens after the lock is released but before
    /// any broadcast reaches this subscriber.
    pub(crate) fn add_log_subscriber(
        &self,
        uuid: &str,
        callback: LogCallback,
        initial: impl FnOnce() -> Option<String>,
    ) -> SubscriptionId {
        let id = self.next_id();
        let subscriber = Arc::new(Subscriber {
            id,
            callback,
            delivery: Mutex::new(()),
        });
        let _delivering = subscriber.delivery.lock();

        let initial = {
            let mut table = self.log_subscribers.write();
            let initial = initial();
            let mut subscribers = table.get(uuid).map(|s| s.to_vec()).unwrap_or_default();
            subscribers.push(Arc::clone(&subscriber));
            table.insert(uuid.to_string(), subscribers.into());
            initial
        };

        (subscriber.callback)(initial.as_deref());
        tracing::debug!(device = %uuid, subscription = %id, "Log subscriber registered");
        id
    }

    /// Unregisters a log subscriber.
    ///
    /// Returns `true` if the subscription was found and removed.
    pub fn remove_log_subscriber(&self, uuid: &str, id: SubscriptionId) -> bool {
        let mut table = self.log_subscribers.write();
        let Some(current) = table.get(uuid) else {
            return false;
        };

        let remaining: Vec<_> = current.iter().filter(|s| s.id != id).cloned().collect();
        if remaining.len() == current.len() {
            return false;
        }

        if remaining.is_empty() {
            table.remove(uuid);
        } else {
            table.insert(uuid.to_string(), remaining.into());
        }
        tracing::debug!(device = %uuid, subscription = %id, "Log subscriber removed");
        true
    }

    /// Sends a log update to every subscriber of `uuid`.
    ///
    /// Returns the number of subscribers reached.
    pub fn publish_log(&self, uuid: &str, update: Option<&str>) -> usize {
        self.publish_log_with(uuid, || {}, &[update])
    }

    /// Runs `apply`, then sends `updates` in order to every subscriber of
    /// `uuid` registered at that point.
    ///
    /// `apply` and the subscriber snapshot happen under one table lock, so a
    /// subscriber registering concurrently either reads the buffer as it was
    /// before `apply` and receives `updates`, or reads it afterwards and
    /// does not. Callbacks run with no table lock held. A callback must not
    /// publish to the device it observes.
    ///
    /// Returns the number of subscribers reached.
    pub(crate) fn publish_log_with(
        &self,
        uuid: &str,
        apply: impl FnOnce(),
        updates: &[Option<&str>],
    ) -> usize {
        let subscribers = {
            let table = self.log_subscribers.read();
            apply();
            table.get(uuid).cloned()
        };
        let Some(subscribers) = subscribers else {
            return 0;
        };

        for subscriber in subscribers.iter() {
            let _delivering = subscriber.delivery.lock();
            for update in updates {
                (subscriber.callback)(*update);
            }
        }
        subscribers.len()
    }

    /// Returns the number of log subscribers for `uuid`.
    #[must_use]
    pub fn log_subscriber_count(&self, uuid: &str) -> usize {
        self.log_subscribers.read().get(uuid).map_or(0, |s| s.len())
    }

    // =========================================================================
    // Poll interval overrides
    // =========================================================================

    /// Returns the poll interval override for `uuid`, if any.
    #[must_use]
    pub fn poll_time(&self, uuid: &str) -> Option<PollTime> {
        self.poll_times.read().get(uuid).copied()
    }

    /// Sets the poll interval for `uuid`.
    ///
    /// A value equal to `default` removes the override instead of storing it.
    pub fn set_poll_time(&self, uuid: &str, value: PollTime, default: PollTime) {
        let mut table = self.poll_times.write();
        if value == default {
            table.remove(uuid);
        } else {
            table.insert(uuid.to_string(), value);
        }
    }

    /// Returns the number of devices with a poll interval override.
    #[must_use]
    pub fn poll_override_count(&self) -> usize {
        self.poll_times.read().len()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Drops every entry held for `uuid`.
    ///
    /// Outstanding [`LogSubscription`](crate::subscription::LogSubscription)
    /// guards for the device become no-ops.
    pub fn remove_device(&self, uuid: &str) {
        self.log_subscribers.write().remove(uuid);
        self.poll_times.write().remove(uuid);
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("log_subscribers", &self.log_subscribers.read().len())
            .field("poll_times", &self.poll_times.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (LogCallback, Arc<Mutex<Vec<Option<String>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: LogCallback = Arc::new(move |update: Option<&str>| {
            sink.lock().push(update.map(str::to_string));
        });
        (callback, seen)
    }

    fn poll(s: &str) -> PollTime {
        s.parse().unwrap()
    }

    #[test]
    fn subscriber_receives_initial_then_broadcasts() {
        let registry = DeviceRegistry::new();
        let (callback, seen) = recorder();

        registry.add_log_subscriber("dev", callback, || Some("old\n".to_string()));
        registry.publish_log("dev", Some("new\n"));
        registry.publish_log("dev", None);

        assert_eq!(
            *seen.lock(),
            vec![Some("old\n".to_string()), Some("new\n".to_string()), None]
        );
    }

    #[test]
    fn publish_is_scoped_to_device() {
        let registry = DeviceRegistry::new();
        let (callback, seen) = recorder();
        registry.add_log_subscriber("a", callback, || None);

        assert_eq!(registry.publish_log("b", Some("x\n")), 0);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn many_subscribers_per_device() {
        let registry = DeviceRegistry::new();
        let (first, first_seen) = recorder();
        let (second, second_seen) = recorder();

        registry.add_log_subscriber("dev", first, || None);
        registry.add_log_subscriber("dev", second, || None);

        assert_eq!(registry.log_subscriber_count("dev"), 2);
        assert_eq!(registry.publish_log("dev", Some("line\n")), 2);
        assert_eq!(first_seen.lock().len(), 2);
        assert_eq!(second_seen.lock().len(), 2);
    }

    #[test]
    fn remove_subscriber() {
        let registry = DeviceRegistry::new();
        let (first, _) = recorder();
        let (second, second_seen) = recorder();

        let first_id = registry.add_log_subscriber("dev", first, || None);
        registry.add_log_subscriber("dev", second, || None);

        assert!(registry.remove_log_subscriber("dev", first_id));
        assert!(!registry.remove_log_subscriber("dev", first_id));
        assert_eq!(registry.log_subscriber_count("dev"), 1);

        registry.publish_log("dev", Some("line\n"));
        assert_eq!(second_seen.lock().len(), 2);
    }

    #[test]
    fn last_removal_drops_table_entry() {
        let registry = DeviceRegistry::new();
        let (callback, _) = recorder();
        let id = registry.add_log_subscriber("dev", callback, || None);

        registry.remove_log_subscriber("dev", id);
        assert_eq!(registry.log_subscriber_count("dev"), 0);
        assert!(registry.log_subscribers.read().is_empty());
    }

    #[test]
    fn poll_time_override_and_reset() {
        let registry = DeviceRegistry::new();
        let idle = poll("00:01:00");
        let updating = poll("00:00:05");

        assert_eq!(registry.poll_time("dev"), None);

        registry.set_poll_time("dev", updating, idle);
        assert_eq!(registry.poll_time("dev"), Some(updating));
        assert_eq!(registry.poll_override_count(), 1);

        registry.set_poll_time("dev", idle, idle);
        assert_eq!(registry.poll_time("dev"), None);
        assert_eq!(registry.poll_override_count(), 0);
    }

    #[test]
    fn remove_device_clears_everything() {
        let registry = DeviceRegistry::new();
        let (callback, _) = recorder();
        let id = registry.add_log_subscriber("dev", callback, || None);
        registry.set_poll_time("dev", poll("00:00:05"), poll("00:01:00"));

        registry.remove_device("dev");

        assert_eq!(registry.log_subscriber_count("dev"), 0);
        assert_eq!(registry.poll_time("dev"), None);
        assert!(!registry.remove_log_subscriber("dev", id));
    }

    #[test]
    fn ids_are_unique() {
        let registry = DeviceRegistry::new();
        let (a, _) = recorder();
        let (b, _) = recorder();
        let first = registry.add_log_subscriber("x", a, || None);
        let second = registry.add_log_subscriber("y", b, || None);
        assert_ne!(first, second);
    }

    #[test]
    fn grouped_updates_arrive_in_order() {
        let registry = DeviceRegistry::new();
        let (callback, seen) = recorder();
        registry.add_log_subscriber("dev", callback, || Some("old\n".to_string()));

        let reached = registry.publish_log_with("dev", || {}, &[None, Some("fresh\n")]);

        assert_eq!(reached, 1);
        assert_eq!(
            *seen.lock(),
            vec![Some("old\n".to_string()), None, Some("fresh\n".to_string())]
        );
    }

    #[test]
    fn apply_runs_before_delivery() {
        let registry = DeviceRegistry::new();
        let buffer = Arc::new(Mutex::new(String::from("old\n")));
        let observed = Arc::new(Mutex::new(Vec::new()));

        let callback: LogCallback = {
            let buffer = Arc::clone(&buffer);
            let observed = Arc::clone(&observed);
            Arc::new(move |_: Option<&str>| observed.lock().push(buffer.lock().clone()))
        };
        registry.add_log_subscriber("dev", callback, || None);

        registry.publish_log_with("dev", || buffer.lock().push_str("new\n"), &[Some("new\n")]);

        assert_eq!(
            *observed.lock(),
            vec!["old\n".to_string(), "old\nnew\n".to_string()]
        );
    }

    #[test]
    fn callback_can_register_during_initial_delivery() {
        let registry = Arc::new(DeviceRegistry::new());
        let (late, late_seen) = recorder();
        let late = Mutex::new(Some(late));

        let callback: LogCallback = {
            let registry = Arc::clone(&registry);
            Arc::new(move |_: Option<&str>| {
                if let Some(late) = late.lock().take() {
                    registry.add_log_subscriber("dev", late, || Some("late\n".to_string()));
                }
            })
        };
        registry.add_log_subscriber("dev", callback, || None);

        assert_eq!(registry.log_subscriber_count("dev"), 2);
        assert_eq!(*late_seen.lock(), vec![Some("late\n".to_string())]);

        registry.remove_device("dev");
    }
}
