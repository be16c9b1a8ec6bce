//! Event Publisher Adapter
//!
//! Implements the `EventPublisher` port with various backends.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::domain::events::RefreshEvent;
use crate::domain::ports::EventPublisher;
use crate::error::Result;

/// Logging-based event publisher.
///
/// Publishes refresh events to the tracing system. Failures are logged at
/// warn/error, discoveries and publishes at info (or debug when quiet).
#[derive(Debug, Clone, Default)]
pub struct LoggingEventPublisher {
    /// Whether to log routine events at info level (true) or debug level (false)
    info_level: bool,
}

impl LoggingEventPublisher {
    /// Create a new logging event publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a publisher that logs routine events at info level.
    pub fn info_level() -> Self {
        Self { info_level: true }
    }
}

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: RefreshEvent) -> Result<()> {
        match &event {
            RefreshEvent::ScanFailed { reason, .. } => {
                error!(reason = %reason, "Device scan failed, keeping previous snapshot");
            }
            RefreshEvent::InvocationFailed {
                drive, exit_code, ..
            } => {
                warn!(drive = %drive, exit_code, "smartctl invocation failed");
            }
            RefreshEvent::AttributeRejected {
                drive,
                field,
                value,
                ..
            } => {
                warn!(drive = %drive, field = %field, value = %value, "Dropped non-numeric attribute");
            }
            RefreshEvent::DeviceDiscovered {
                drive, device_type, ..
            } => {
                if self.info_level {
                    info!(drive = %drive, device_type = %device_type, "Discovered device");
                } else {
                    debug!(drive = %drive, device_type = %device_type, "Discovered device");
                }
            }
            RefreshEvent::SnapshotPublished {
                devices,
                samples,
                duration_ms,
                ..
            } => {
                if self.info_level {
                    info!(devices, samples, duration_ms, "Published snapshot");
                } else {
                    debug!(devices, samples, duration_ms, "Published snapshot");
                }
            }
        }

        Ok(())
    }

    async fn publish_all(&self, events: Vec<RefreshEvent>) -> Result<()> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

/// In-memory event collector for testing.
///
/// Collects events in memory for later inspection during tests.
#[derive(Debug, Default)]
pub struct InMemoryEventCollector {
    events: parking_lot::RwLock<Vec<RefreshEvent>>,
}

impl InMemoryEventCollector {
    /// Create a new in-memory event collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected events.
    pub fn events(&self) -> Vec<RefreshEvent> {
        self.events.read().clone()
    }

    /// Get the count of collected events.
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Check if there are no events.
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clear all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Get events of a specific type.
    pub fn events_of_type(&self, event_type: &str) -> Vec<RefreshEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventCollector {
    async fn publish(&self, event: RefreshEvent) -> Result<()> {
        self.events.write().push(event);
        Ok(())
    }

    async fn publish_all(&self, events: Vec<RefreshEvent>) -> Result<()> {
        self.events.write().extend(events);
        Ok(())
    }
}
