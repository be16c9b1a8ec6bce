//! Snapshot
//!
//! The complete, immutable sample set of one refresh cycle.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::normalizer::MetricSample;

/// All samples of one refresh cycle, in device discovery order.
///
/// Carries no timestamps, so two cycles over identical smartctl output
/// compare equal and render identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    samples: Vec<MetricSample>,
}

impl Snapshot {
    pub fn new(samples: Vec<MetricSample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples grouped by metric name, names sorted, samples in snapshot
    /// order within each family.
    pub fn families(&self) -> BTreeMap<&str, Vec<&MetricSample>> {
        let mut families: BTreeMap<&str, Vec<&MetricSample>> = BTreeMap::new();
        for sample in &self.samples {
            families.entry(sample.name.as_str()).or_default().push(sample);
        }
        families
    }

    /// Samples carrying the given `drive` label.
    pub fn for_drive<'a>(&'a self, drive: &'a str) -> impl Iterator<Item = &'a MetricSample> + 'a {
        self.samples
            .iter()
            .filter(move |s| s.label("drive") == Some(drive))
    }
}

/// A snapshot together with publication metadata.
#[derive(Debug, Clone)]
pub struct PublishedSnapshot {
    pub snapshot: Snapshot,
    pub published_at: DateTime<Utc>,
    /// Devices processed in the cycle
    pub devices: usize,
    /// Wall time the cycle took
    pub duration: Duration,
}

impl PublishedSnapshot {
    pub fn new(snapshot: Snapshot, devices: usize, duration: Duration) -> Self {
        Self {
            snapshot,
            published_at: Utc::now(),
            devices,
            duration,
        }
    }

    /// Time since publication. Zero if the clock went backwards.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.published_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}
