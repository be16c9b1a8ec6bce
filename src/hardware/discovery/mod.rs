//! Hardware Discovery Components
//!
//! Device model and enumeration of the storage devices smartctl can see.

pub mod megaraid;
pub mod scanner;

use serde::{Deserialize, Serialize};

// =============================================================================
// Protocol Types
// =============================================================================

/// Protocol family of a device; selects which attribute schema applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolType {
    /// ATA/SATA, including SATA drives behind SAT bridges and RAID controllers
    Sata,
    /// SCSI/SAS
    Scsi,
    /// NVMe
    Nvme,
    /// Anything smartctl did not classify
    Unknown,
}

impl ProtocolType {
    /// Map smartctl's `device.protocol` field ("ATA", "SCSI", "NVMe").
    pub fn from_protocol(protocol: &str) -> Self {
        match protocol.trim().to_ascii_lowercase().as_str() {
            "ata" | "sata" => ProtocolType::Sata,
            "scsi" | "sas" => ProtocolType::Scsi,
            "nvme" => ProtocolType::Nvme,
            _ => ProtocolType::Unknown,
        }
    }

    /// Best guess from a smartctl `-d` device type, used until the info
    /// output tells us the real protocol.
    pub fn from_device_type(device_type: &str) -> Self {
        let device_type = device_type.trim().to_ascii_lowercase();
        if device_type == "nvme" || device_type.starts_with("snt") {
            ProtocolType::Nvme
        } else if device_type == "ata"
            || device_type.starts_with("sat")
            || device_type.starts_with("usb")
        {
            ProtocolType::Sata
        } else if device_type == "scsi" || device_type == "sas" {
            ProtocolType::Scsi
        } else {
            ProtocolType::Unknown
        }
    }

    /// Short name used for the `type` label of RAID-attached drives.
    pub fn type_label(&self) -> &'static str {
        match self {
            ProtocolType::Sata => "sat",
            ProtocolType::Scsi => "sas",
            ProtocolType::Nvme => "nvme",
            ProtocolType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ProtocolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolType::Sata => write!(f, "SATA"),
            ProtocolType::Scsi => write!(f, "SCSI"),
            ProtocolType::Nvme => write!(f, "NVMe"),
            ProtocolType::Unknown => write!(f, "Unknown"),
        }
    }
}

// =============================================================================
// Device
// =============================================================================

/// One storage unit to query, rediscovered on every refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Identifier used for the `drive` label (e.g. `/dev/sda`, `megaraid,0`)
    pub path: String,
    /// Device operand handed to smartctl (the controller bus path for RAID drives)
    pub target: String,
    /// smartctl device type as reported by the scan (e.g. `sat`, `nvme`, `megaraid,0`)
    pub device_type: String,
    /// Protocol hint from the scan
    pub protocol: ProtocolType,
    /// Whether the device sits behind a USB bridge
    pub bridged: bool,
}

impl Device {
    /// A device addressed directly by its path.
    pub fn plain(path: impl Into<String>, device_type: impl Into<String>) -> Self {
        let path = path.into();
        let device_type = device_type.into();
        Self {
            target: path.clone(),
            protocol: ProtocolType::from_device_type(&device_type),
            bridged: is_bridge_type(&device_type),
            path,
            device_type,
        }
    }

    /// A physical drive behind a RAID controller.
    pub fn raid(controller: impl Into<String>, drive_index: u32) -> Self {
        let id = megaraid::drive_id(drive_index);
        Self {
            path: id.clone(),
            target: controller.into(),
            device_type: id,
            protocol: ProtocolType::Unknown,
            bridged: false,
        }
    }

    /// Prefix the path with the controller, for drives whose short
    /// `megaraid,N` path is already taken by another controller.
    pub fn qualified(mut self) -> Self {
        self.path = format!("{}:{}", self.target, self.path);
        self
    }

    /// Set the protocol hint.
    pub fn with_protocol(mut self, protocol: ProtocolType) -> Self {
        self.protocol = protocol;
        self
    }

    /// Whether this is a synthetic per-drive identity on a RAID controller.
    pub fn is_raid(&self) -> bool {
        self.path != self.target
    }

    /// Whether info calls must pass `-d <device_type>` explicitly.
    pub fn needs_type_arg(&self) -> bool {
        self.bridged || self.is_raid()
    }

    /// Value of the `type` label once the protocol is known.
    pub fn type_label(&self, protocol: ProtocolType) -> String {
        if self.is_raid() {
            protocol.type_label().to_string()
        } else {
            self.device_type.clone()
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_raid() {
            write!(f, "{} ({})", self.path, self.target)
        } else {
            write!(f, "{}", self.path)
        }
    }
}

/// USB (`usb*`) and USB-to-NVMe (`snt*`) bridge types need the bridge
/// named explicitly on every call.
pub fn is_bridge_type(device_type: &str) -> bool {
    let device_type = device_type.trim().to_ascii_lowercase();
    device_type.starts_with("usb") || device_type.starts_with("snt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_from_protocol_field() {
        assert_eq!(ProtocolType::from_protocol("ATA"), ProtocolType::Sata);
        assert_eq!(ProtocolType::from_protocol("SCSI"), ProtocolType::Scsi);
        assert_eq!(ProtocolType::from_protocol("NVMe"), ProtocolType::Nvme);
        assert_eq!(ProtocolType::from_protocol("CSMI"), ProtocolType::Unknown);
    }

    #[test]
    fn test_protocol_from_device_type() {
        assert_eq!(ProtocolType::from_device_type("sat"), ProtocolType::Sata);
        assert_eq!(ProtocolType::from_device_type("sat+megaraid,0"), ProtocolType::Sata);
        assert_eq!(ProtocolType::from_device_type("usbjmicron"), ProtocolType::Sata);
        assert_eq!(ProtocolType::from_device_type("sntasmedia"), ProtocolType::Nvme);
        assert_eq!(ProtocolType::from_device_type("nvme"), ProtocolType::Nvme);
        assert_eq!(ProtocolType::from_device_type("scsi"), ProtocolType::Scsi);
        assert_eq!(ProtocolType::from_device_type("megaraid"), ProtocolType::Unknown);
    }

    #[test]
    fn test_plain_device() {
        let device = Device::plain("/dev/sda", "sat");
        assert_eq!(device.target, "/dev/sda");
        assert_eq!(device.protocol, ProtocolType::Sata);
        assert!(!device.bridged);
        assert!(!device.is_raid());
        assert!(!device.needs_type_arg());
        assert_eq!(device.type_label(ProtocolType::Sata), "sat");
    }

    #[test]
    fn test_bridged_device() {
        let device = Device::plain("/dev/sdc", "usbjmicron");
        assert!(device.bridged);
        assert!(device.needs_type_arg());
        assert_eq!(device.to_string(), "/dev/sdc");
    }

    #[test]
    fn test_raid_device() {
        let device = Device::raid("/dev/bus/0", 1);
        assert_eq!(device.path, "megaraid,1");
        assert_eq!(device.target, "/dev/bus/0");
        assert_eq!(device.device_type, "megaraid,1");
        assert!(device.is_raid());
        assert!(device.needs_type_arg());
        assert_eq!(device.type_label(ProtocolType::Scsi), "sas");
        assert_eq!(device.to_string(), "megaraid,1 (/dev/bus/0)");
    }

    #[test]
    fn test_qualified_raid_device() {
        let device = Device::raid("/dev/bus/1", 0).qualified();
        assert_eq!(device.path, "/dev/bus/1:megaraid,0");
        assert_eq!(device.target, "/dev/bus/1");
        assert!(device.needs_type_arg());
    }
}
