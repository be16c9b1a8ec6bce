//! Metrics module
//!
//! Normalizes parsed SMART data into Prometheus samples and holds the
//! per-cycle snapshot.

pub mod normalizer;
pub mod snapshot;

pub use normalizer::{
    device_labels, help_text, normalize, sanitize, Labels, MetricSample, Normalized, LABEL_KEYS,
    METRIC_PREFIX, USER_CAPACITY,
};
pub use snapshot::{PublishedSnapshot, Snapshot};
