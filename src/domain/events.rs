//! Refresh Events
//!
//! Immutable records of things that happened during a refresh cycle. Every
//! failure in the pipeline is scoped to one attribute, one device or one
//! cycle, and is surfaced to operators as one of these events rather than
//! as a scrape-time error.
//!
//! # Example
//!
//! ```ignore
//! let event = RefreshEvent::invocation_failed("/dev/sda", -1);
//!
//! event_publisher.publish(event).await?;
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Event representing a significant occurrence in a refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RefreshEvent {
    // =========================================================================
    // Discovery Events
    // =========================================================================
    /// A device was discovered by the scan.
    DeviceDiscovered {
        drive: String,
        device_type: String,
        timestamp: DateTime<Utc>,
    },

    /// The scan produced no usable device list.
    ScanFailed {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // =========================================================================
    // Device Events
    // =========================================================================
    /// The diagnostic call for one device failed or timed out.
    InvocationFailed {
        drive: String,
        exit_code: i32,
        timestamp: DateTime<Utc>,
    },

    /// An attribute value could not be coerced to a number and was dropped.
    AttributeRejected {
        drive: String,
        field: String,
        value: String,
        timestamp: DateTime<Utc>,
    },

    // =========================================================================
    // Cycle Events
    // =========================================================================
    /// A new snapshot replaced the previous one.
    SnapshotPublished {
        devices: usize,
        samples: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl RefreshEvent {
    /// Get the event type as a string.
    pub fn event_type(&self) -> &'static str {
        match self {
            RefreshEvent::DeviceDiscovered { .. } => "DeviceDiscovered",
            RefreshEvent::ScanFailed { .. } => "ScanFailed",
            RefreshEvent::InvocationFailed { .. } => "InvocationFailed",
            RefreshEvent::AttributeRejected { .. } => "AttributeRejected",
            RefreshEvent::SnapshotPublished { .. } => "SnapshotPublished",
        }
    }

    /// Get the drive path if applicable.
    pub fn drive(&self) -> Option<&str> {
        match self {
            RefreshEvent::DeviceDiscovered { drive, .. } => Some(drive),
            RefreshEvent::InvocationFailed { drive, .. } => Some(drive),
            RefreshEvent::AttributeRejected { drive, .. } => Some(drive),
            _ => None,
        }
    }

    /// Get the event timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            RefreshEvent::DeviceDiscovered { timestamp, .. }
            | RefreshEvent::ScanFailed { timestamp, .. }
            | RefreshEvent::InvocationFailed { timestamp, .. }
            | RefreshEvent::AttributeRejected { timestamp, .. }
            | RefreshEvent::SnapshotPublished { timestamp, .. } => *timestamp,
        }
    }
}

// =============================================================================
// Event Builders
// =============================================================================

impl RefreshEvent {
    /// Create a DeviceDiscovered event.
    pub fn device_discovered(drive: impl Into<String>, device_type: impl Into<String>) -> Self {
        RefreshEvent::DeviceDiscovered {
            drive: drive.into(),
            device_type: device_type.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a ScanFailed event.
    pub fn scan_failed(reason: impl Into<String>) -> Self {
        RefreshEvent::ScanFailed {
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an InvocationFailed event.
    pub fn invocation_failed(drive: impl Into<String>, exit_code: i32) -> Self {
        RefreshEvent::InvocationFailed {
            drive: drive.into(),
            exit_code,
            timestamp: Utc::now(),
        }
    }

    /// Create an AttributeRejected event.
    pub fn attribute_rejected(
        drive: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        RefreshEvent::AttributeRejected {
            drive: drive.into(),
            field: field.into(),
            value: value.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a SnapshotPublished event.
    pub fn snapshot_published(devices: usize, samples: usize, duration: Duration) -> Self {
        RefreshEvent::SnapshotPublished {
            devices,
            samples,
            duration_ms: duration.as_millis() as u64,
            timestamp: Utc::now(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = RefreshEvent::device_discovered("/dev/sda", "sat");

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("DeviceDiscovered"));
        assert!(json.contains("/dev/sda"));

        let deserialized: RefreshEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.event_type(), "DeviceDiscovered");
    }

    #[test]
    fn test_drive_extraction() {
        let event = RefreshEvent::attribute_rejected("megaraid,1", "Temperature_Celsius", "n/a");
        assert_eq!(event.drive(), Some("megaraid,1"));

        let event = RefreshEvent::scan_failed("exit code 2");
        assert_eq!(event.drive(), None);
    }

    #[test]
    fn test_timestamp() {
        let before = Utc::now();
        let event = RefreshEvent::invocation_failed("/dev/sdb", -1);
        let after = Utc::now();

        assert!(event.timestamp() >= before);
        assert!(event.timestamp() <= after);
    }

    #[test]
    fn test_snapshot_published_duration() {
        let event = RefreshEvent::snapshot_published(3, 120, Duration::from_millis(1500));
        match event {
            RefreshEvent::SnapshotPublished {
                devices,
                samples,
                duration_ms,
                ..
            } => {
                assert_eq!(devices, 3);
                assert_eq!(samples, 120);
                assert_eq!(duration_ms, 1500);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
