// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Firmware candidate selection by update mode.
//!
//! Read-only: resolution queries the store but never changes device or
//! rollout state.

use crate::error::StoreError;
use crate::store::DeviceStore;
use crate::types::{Device, Firmware, Rollout, UpdateMode};

/// Returns the rollout governing `device`.
///
/// Only devices in [`UpdateMode::Rollout`] are bound to a rollout; for them
/// it is the most recently created rollout whose firmware is compatible
/// with the device hardware. Paused rollouts are returned as well.
pub(crate) async fn bound_rollout<S: DeviceStore>(
    store: &S,
    device: &Device,
) -> Result<Option<Rollout>, StoreError> {
    if device.update_mode != UpdateMode::Rollout {
        return Ok(None);
    }
    store.latest_rollout(device).await
}

/// Returns the firmware that should be offered to `device`, if any.
pub(crate) async fn candidate_firmware<S: DeviceStore>(
    store: &S,
    device: &Device,
) -> Result<Option<Firmware>, StoreError> {
    match device.update_mode {
        UpdateMode::Rollout => Ok(bound_rollout(store, device)
            .await?
            .filter(|rollout| !rollout.paused)
            .map(|rollout| rollout.firmware)),
        UpdateMode::Assigned => Ok(device.assigned_firmware.clone()),
        UpdateMode::Latest => store.latest_firmware(Some(&device.hardware)).await,
        UpdateMode::Pinned => Ok(None),
    }
}
