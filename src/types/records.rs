// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persisted records the update core reads and writes.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use super::{UpdateMode, UpdateState};

/// A device class, identified by model and revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hardware {
    /// Store identifier.
    pub id: u64,
    /// Hardware model name.
    pub model: String,
    /// Hardware revision.
    pub revision: String,
}

impl Hardware {
    /// Model and revision assigned to devices that have not reported theirs.
    pub const DEFAULT_MODEL: &'static str = "default";
    /// See [`Hardware::DEFAULT_MODEL`].
    pub const DEFAULT_REVISION: &'static str = "default";

    /// Returns true if both records describe the same device class.
    #[must_use]
    pub fn same_class(&self, other: &Hardware) -> bool {
        self.model == other.model && self.revision == other.revision
    }
}

/// A firmware image and the hardware classes it can be installed on.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Firmware {
    /// Store identifier.
    pub id: u64,
    /// Where the device agent downloads the image from.
    pub uri: String,
    /// Version string reported by devices running this image.
    pub version: String,
    /// Hardware classes this image is built for.
    pub compatibility: Vec<Hardware>,
}

impl Firmware {
    /// Returns true if the image can be installed on `hardware`.
    #[must_use]
    pub fn is_compatible_with(&self, hardware: &Hardware) -> bool {
        self.compatibility.iter().any(|hw| hw.same_class(hardware))
    }

    /// Parses the version as a semantic version.
    ///
    /// Missing minor or patch components are treated as zero, so `"2.0"`
    /// parses as `2.0.0`. Returns `None` for versions that are not numeric.
    #[must_use]
    pub fn semantic_version(&self) -> Option<semver::Version> {
        parse_lenient(&self.version)
    }

    /// Orders two images by version.
    ///
    /// Semantic versions sort above non-semantic ones; non-semantic versions
    /// fall back to plain string ordering.
    #[must_use]
    pub fn cmp_version(&self, other: &Firmware) -> Ordering {
        match (self.semantic_version(), other.semantic_version()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => self.version.cmp(&other.version),
        }
    }
}

fn parse_lenient(version: &str) -> Option<semver::Version> {
    let version = version.trim().trim_start_matches('v');
    if let Ok(parsed) = semver::Version::parse(version) {
        return Some(parsed);
    }

    let (core, rest) = match version.find(['-', '+']) {
        Some(idx) => version.split_at(idx),
        None => (version, ""),
    };
    let dots = core.matches('.').count();
    let padded = match dots {
        0 => format!("{core}.0.0{rest}"),
        1 => format!("{core}.0{rest}"),
        _ => return None,
    };
    semver::Version::parse(&padded).ok()
}

/// A staged deployment of one firmware image to every compatible device.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rollout {
    /// Store identifier.
    pub id: u64,
    /// Optional human readable name.
    pub name: Option<String>,
    /// The image being deployed.
    pub firmware: Firmware,
    /// Paused rollouts offer nothing.
    pub paused: bool,
    /// Creation time; the newest matching rollout governs a device.
    pub created_at: DateTime<Utc>,
}

/// Persisted state of a single device.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Device {
    /// Globally unique device identity.
    pub uuid: String,
    /// Display name.
    pub name: Option<String>,
    /// Device class.
    pub hardware: Hardware,
    /// Last installed version reported by the device.
    pub fw_version: Option<String>,
    /// Last known update state.
    pub last_state: UpdateState,
    /// Firmware selection policy.
    pub update_mode: UpdateMode,
    /// Firmware to offer when `update_mode` is [`UpdateMode::Assigned`].
    pub assigned_firmware: Option<Firmware>,
    /// One-shot override that bypasses the same-version and error skips.
    pub force_update: bool,
    /// Time of the last poll.
    pub last_seen: Option<DateTime<Utc>>,
    /// Last IPv4 address the device connected from.
    pub last_ip: Option<String>,
    /// Last IPv6 address the device connected from.
    pub last_ipv6: Option<String>,
    /// Download progress of the running update, in percent.
    pub progress: Option<u8>,
    /// Accumulated installation log.
    pub last_log: Option<String>,
    /// The device reported the end of its installation log.
    pub log_complete: bool,
}

impl Device {
    /// Creates a fresh device record with default policy fields.
    #[must_use]
    pub fn new(uuid: impl Into<String>, hardware: Hardware) -> Self {
        Self {
            uuid: uuid.into(),
            name: None,
            hardware,
            fw_version: None,
            last_state: UpdateState::default(),
            update_mode: UpdateMode::default(),
            assigned_firmware: None,
            force_update: false,
            last_seen: None,
            last_ip: None,
            last_ipv6: None,
            progress: None,
            last_log: None,
            log_complete: false,
        }
    }
}

/// Columns of a [`Device`] that can be persisted individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceField {
    /// [`Device::name`]
    Name,
    /// [`Device::hardware`]
    Hardware,
    /// [`Device::fw_version`]
    FwVersion,
    /// [`Device::last_state`]
    LastState,
    /// [`Device::update_mode`]
    UpdateMode,
    /// [`Device::assigned_firmware`]
    AssignedFirmware,
    /// [`Device::force_update`]
    ForceUpdate,
    /// [`Device::last_seen`]
    LastSeen,
    /// [`Device::last_ip`]
    LastIp,
    /// [`Device::last_ipv6`]
    LastIpv6,
    /// [`Device::progress`]
    Progress,
    /// [`Device::last_log`]
    LastLog,
    /// [`Device::log_complete`]
    LogComplete,
}

impl DeviceField {
    /// Copies this field from `source` into `target`.
    pub fn copy(self, source: &Device, target: &mut Device) {
        match self {
            Self::Name => target.name.clone_from(&source.name),
            Self::Hardware => target.hardware = source.hardware.clone(),
            Self::FwVersion => target.fw_version.clone_from(&source.fw_version),
            Self::LastState => target.last_state = source.last_state,
            Self::UpdateMode => target.update_mode = source.update_mode,
            Self::AssignedFirmware => target
                .assigned_firmware
                .clone_from(&source.assigned_firmware),
            Self::ForceUpdate => target.force_update = source.force_update,
            Self::LastSeen => target.last_seen = source.last_seen,
            Self::LastIp => target.last_ip.clone_from(&source.last_ip),
            Self::LastIpv6 => target.last_ipv6.clone_from(&source.last_ipv6),
            Self::Progress => target.progress = source.progress,
            Self::LastLog => target.last_log.clone_from(&source.last_log),
            Self::LogComplete => target.log_complete = source.log_complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hardware(model: &str, revision: &str) -> Hardware {
        Hardware {
            id: 0,
            model: model.to_string(),
            revision: revision.to_string(),
        }
    }

    fn firmware(version: &str) -> Firmware {
        Firmware {
            id: 1,
            uri: format!("file:///fw/{version}.swu"),
            version: version.to_string(),
            compatibility: vec![hardware("board", "a")],
        }
    }

    #[test]
    fn compatibility_ignores_store_id() {
        let fw = firmware("1.0.0");
        let mut hw = hardware("board", "a");
        hw.id = 42;
        assert!(fw.is_compatible_with(&hw));
        assert!(!fw.is_compatible_with(&hardware("board", "b")));
    }

    #[test]
    fn short_versions_are_padded() {
        assert_eq!(
            firmware("2.0").semantic_version(),
            Some(semver::Version::new(2, 0, 0))
        );
        assert_eq!(
            firmware("3").semantic_version(),
            Some(semver::Version::new(3, 0, 0))
        );
        assert_eq!(
            firmware("v1.2.3").semantic_version(),
            Some(semver::Version::new(1, 2, 3))
        );
    }

    #[test]
    fn prerelease_survives_padding() {
        let version = firmware("1.4-rc1").semantic_version().unwrap();
        assert_eq!(version.major, 1);
        assert_eq!(version.minor, 4);
        assert!(!version.pre.is_empty());
    }

    #[test]
    fn version_ordering() {
        assert_eq!(firmware("1.10").cmp_version(&firmware("1.9")), Ordering::Greater);
        assert_eq!(firmware("2.0").cmp_version(&firmware("2.0.0")), Ordering::Equal);
        assert_eq!(firmware("nightly").cmp_version(&firmware("0.1")), Ordering::Less);
    }

    #[test]
    fn new_device_defaults() {
        let device = Device::new("abc", hardware("default", "default"));
        assert_eq!(device.last_state, UpdateState::Unknown);
        assert_eq!(device.update_mode, UpdateMode::Rollout);
        assert!(!device.force_update);
        assert!(device.last_log.is_none());
    }

    #[test]
    fn field_copy_touches_only_that_field() {
        let mut source = Device::new("abc", hardware("default", "default"));
        source.fw_version = Some("1.0".to_string());
        source.name = Some("kitchen".to_string());

        let mut target = Device::new("abc", hardware("default", "default"));
        DeviceField::FwVersion.copy(&source, &mut target);

        assert_eq!(target.fw_version.as_deref(), Some("1.0"));
        assert!(target.name.is_none());
    }
}
