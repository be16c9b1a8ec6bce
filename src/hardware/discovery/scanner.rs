//! Device Enumerator
//!
//! Lists the devices smartctl can open, expanding RAID controllers into one
//! synthetic device per physical drive and flagging USB-bridged devices.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::{megaraid, Device, ProtocolType};
use crate::domain::events::RefreshEvent;
use crate::domain::ports::{CommandOutput, EventPublisher};
use crate::error::{Error, Result};
use crate::smartctl::{Mode, SmartctlInvoker};

/// Device type assumed when a scan entry omits one.
const DEFAULT_DEVICE_TYPE: &str = "auto";

// =============================================================================
// Scan Output
// =============================================================================

#[derive(Debug, Deserialize)]
struct ScanOutput {
    #[serde(default)]
    devices: Option<Vec<ScanEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ScanEntry {
    name: String,
    #[serde(rename = "type", default)]
    device_type: String,
    #[serde(default)]
    protocol: Option<String>,
}

impl ScanEntry {
    fn device_type(&self) -> &str {
        if self.device_type.trim().is_empty() {
            DEFAULT_DEVICE_TYPE
        } else {
            self.device_type.trim()
        }
    }

    fn protocol_hint(&self) -> ProtocolType {
        self.protocol
            .as_deref()
            .map(ProtocolType::from_protocol)
            .filter(|p| *p != ProtocolType::Unknown)
            .unwrap_or_else(|| ProtocolType::from_device_type(self.device_type()))
    }
}

/// Decode a `--scan-open --json` result.
///
/// A non-zero exit with a device list is still a usable scan; no output, an
/// undecodable payload, or a non-zero exit without a list is not.
fn parse_scan(output: &CommandOutput) -> Result<Vec<ScanEntry>> {
    if output.stdout.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(Error::ScanFailed(format!(
            "no output (exit code {})",
            output.exit_code
        )));
    }

    let scan: ScanOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| Error::ScanFailed(format!("undecodable scan output: {}", e)))?;

    match scan.devices {
        Some(devices) => Ok(devices),
        None if output.exit_code != 0 => Err(Error::ScanFailed(format!(
            "exit code {} with no device list",
            output.exit_code
        ))),
        None => Ok(Vec::new()),
    }
}

// =============================================================================
// Device Enumerator
// =============================================================================

/// Discovers the devices to query in one refresh cycle.
pub struct DeviceEnumerator {
    invoker: SmartctlInvoker,
    events: Arc<dyn EventPublisher>,
}

impl DeviceEnumerator {
    /// Create a new enumerator
    pub fn new(invoker: SmartctlInvoker, events: Arc<dyn EventPublisher>) -> Self {
        Self { invoker, events }
    }

    /// Produce the full device list for this cycle.
    ///
    /// Returns [`Error::ScanFailed`] when the top-level scan yields no usable
    /// list. A failing follow-up controller scan only drops that
    /// controller's drives.
    #[instrument(skip(self))]
    pub async fn enumerate(&self) -> Result<Vec<Device>> {
        let output = self.invoker.run(None, Mode::Scan, &[]).await;
        let entries = parse_scan(&output)?;

        let mut devices = Vec::with_capacity(entries.len());
        let mut seen = DeviceSet::default();

        for entry in entries {
            let found = if megaraid::is_controller(entry.device_type()) {
                self.expand_controller(&entry.name).await
            } else {
                vec![Self::device_from_entry(&entry)]
            };

            devices.extend(found.into_iter().filter_map(|device| seen.admit(device)));
        }

        info!("Discovered {} devices", devices.len());

        let events = devices
            .iter()
            .map(|d| RefreshEvent::device_discovered(&d.path, &d.device_type))
            .collect();
        if let Err(e) = self.events.publish_all(events).await {
            warn!("Failed to publish discovery events: {}", e);
        }

        Ok(devices)
    }

    /// Ask smartctl for the physical drives behind one controller.
    #[instrument(skip(self))]
    async fn expand_controller(&self, controller: &str) -> Vec<Device> {
        let extra_args = vec!["-d".to_string(), megaraid::CONTROLLER_TYPE.to_string()];
        let output = self
            .invoker
            .run(Some(controller), Mode::Scan, &extra_args)
            .await;

        match parse_scan(&output) {
            Ok(entries) => {
                let drives: Vec<Device> = entries
                    .iter()
                    .filter_map(|entry| {
                        megaraid::drive_index(entry.device_type()).map(|index| {
                            Device::raid(controller, index).with_protocol(entry.protocol_hint())
                        })
                    })
                    .collect();
                debug!("Controller {} exposes {} drives", controller, drives.len());
                drives
            }
            Err(e) => {
                warn!("Failed to expand RAID controller {}: {}", controller, e);
                Vec::new()
            }
        }
    }

    fn device_from_entry(entry: &ScanEntry) -> Device {
        match megaraid::drive_index(entry.device_type()) {
            Some(index) => Device::raid(&entry.name, index).with_protocol(entry.protocol_hint()),
            None => Device::plain(&entry.name, entry.device_type())
                .with_protocol(entry.protocol_hint()),
        }
    }
}

/// Tracks the devices already admitted in one enumeration.
///
/// A device smartctl reports twice (same operand, same type) is skipped. RAID
/// drives on different controllers share the short `megaraid,N` path; the
/// later ones are renamed to `<controller>:megaraid,N` so every drive keeps
/// its own `drive` label.
#[derive(Debug, Default)]
struct DeviceSet {
    operands: HashSet<(String, String)>,
    paths: HashSet<String>,
}

impl DeviceSet {
    fn admit(&mut self, mut device: Device) -> Option<Device> {
        if !self
            .operands
            .insert((device.target.clone(), device.device_type.clone()))
        {
            warn!("Skipping duplicate device {}", device);
            return None;
        }

        if self.paths.contains(&device.path) {
            if !device.is_raid() {
                warn!("Skipping duplicate device {}", device);
                return None;
            }
            device = device.qualified();
            debug!("Renamed colliding RAID drive to {}", device.path);
        }

        self.paths.insert(device.path.clone());
        Some(device)
    }
}

impl std::fmt::Debug for DeviceEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceEnumerator")
            .field("invoker", &self.invoker)
            .finish()
    }
}
