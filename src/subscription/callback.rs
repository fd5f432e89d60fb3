// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback types for log subscriptions.

use std::sync::Arc;

/// Unique identifier for a log subscription.
///
/// IDs are unique within one [`DeviceRegistry`](crate::registry::DeviceRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Callback receiving log updates for one device.
///
/// `Some(text)` is text to append to the observer's view (or, for the
/// initial delivery, the whole current log). `None` tells the observer to
/// clear its view.
pub type LogCallback = Arc<dyn Fn(Option<&str>) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        assert_eq!(SubscriptionId::new(7).to_string(), "Sub(7)");
        assert_eq!(SubscriptionId::new(7).value(), 7);
    }
}
