// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scope guard that keeps a log subscription alive.

use std::fmt;
use std::sync::Arc;

use crate::registry::DeviceRegistry;

use super::SubscriptionId;

/// An active log subscription.
///
/// The callback stays registered for as long as this value lives. Dropping
/// it unregisters the callback, which also happens when the task holding
/// it is cancelled.
#[must_use = "the subscription ends as soon as the guard is dropped"]
pub struct LogSubscription {
    registry: Arc<DeviceRegistry>,
    uuid: String,
    id: SubscriptionId,
}

impl LogSubscription {
    pub(crate) fn new(registry: Arc<DeviceRegistry>, uuid: String, id: SubscriptionId) -> Self {
        Self { registry, uuid, id }
    }

    /// Returns the subscription ID.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the identity of the observed device.
    #[must_use]
    pub fn device(&self) -> &str {
        &self.uuid
    }
}

impl Drop for LogSubscription {
    fn drop(&mut self) {
        self.registry.remove_log_subscriber(&self.uuid, self.id);
    }
}

impl fmt::Debug for LogSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSubscription")
            .field("uuid", &self.uuid)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
