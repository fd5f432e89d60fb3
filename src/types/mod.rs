// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Domain types for update decisions.
//!
//! - [`Device`], [`Hardware`], [`Firmware`], [`Rollout`] - persisted records
//! - [`UpdateState`], [`UpdateMode`] - device state and firmware policy
//! - [`HandlingType`] - the outcome of a poll
//! - [`PollTime`] - polling interval as a time of day

mod poll_time;
mod records;
mod update_state;

pub use poll_time::PollTime;
pub use records::{Device, DeviceField, Firmware, Hardware, Rollout};
pub use update_state::{HandlingType, UpdateMode, UpdateState};
