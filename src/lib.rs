//! smartprom - SMART Prometheus Exporter
//!
//! Periodically queries the health telemetry of local storage devices with
//! smartctl and republishes it as Prometheus gauges.
//!
//! Devices behind MegaRAID controllers and USB bridges are discovered
//! alongside plain SATA, SAS and NVMe devices. Every attribute is exported
//! under a sanitized `smartprom_` name with the same label set per device.
//!
//! # Architecture
//!
//! ```text
//! Enumerator → Invoker → Parser → Normalizer → Snapshot ──▶ /metrics
//!      ▲                                          │
//!      └──────────── Refresh Scheduler ───────────┘
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Infrastructure adapters implementing domain ports
//! - [`controller`] - Background refresh loop
//! - [`domain`] - Ports and refresh events
//! - [`error`] - Error types
//! - [`hardware`] - Device discovery
//! - [`metrics`] - Name sanitization, labels and snapshots
//! - [`parser`] - smartctl output parsing
//! - [`smartctl`] - Command construction and invocation

pub mod adapters;
pub mod controller;
pub mod domain;
pub mod error;
pub mod hardware;
pub mod metrics;
pub mod parser;
pub mod smartctl;

// Re-export commonly used types
pub use adapters::PrometheusRegistryAdapter;
pub use controller::{RefreshConfig, RefreshScheduler, SnapshotHandle};
pub use error::{Error, Result};
pub use hardware::{Device, DeviceEnumerator, ProtocolType};
pub use metrics::{MetricSample, Snapshot};
pub use smartctl::{InvokerConfig, SmartctlInvoker};
