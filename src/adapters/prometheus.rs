//! Prometheus Registry Adapter
//!
//! Renders a [`Snapshot`] into a `prometheus::Registry` and encodes it in the
//! text exposition format.
//!
//! Each snapshot gets a fresh registry, so series of devices that vanished
//! since the previous cycle never linger.

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::metrics::{help_text, MetricSample, Snapshot, LABEL_KEYS, USER_CAPACITY};

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Declares one gauge family per metric name and fills it from a snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusRegistryAdapter;

impl PrometheusRegistryAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Build a registry holding every sample of `snapshot`.
    ///
    /// A family declares the union of the label keys its samples carry, in
    /// canonical order. Samples without an optional label get an empty
    /// value here; [`encode`](Self::encode) drops those pairs again.
    #[instrument(skip(self, snapshot), fields(samples = snapshot.len()))]
    pub fn render(&self, snapshot: &Snapshot) -> Result<Registry> {
        let registry = Registry::new();

        for (name, samples) in snapshot.families() {
            let keys = declared_keys(&samples);
            let gauge = GaugeVec::new(Opts::new(name, help_text(name)), &keys)?;

            for sample in samples {
                let values: Vec<&str> = keys
                    .iter()
                    .map(|key| sample.label(key).unwrap_or(""))
                    .collect();
                gauge.with_label_values(values.as_slice()).set(sample.value);
            }

            registry.register(Box::new(gauge))?;
        }

        debug!("Rendered snapshot into registry");
        Ok(registry)
    }

    /// Encode a registry in the text exposition format.
    ///
    /// Series of a device with unknown capacity carry no `user_capacity`
    /// label, even when other series of the family do.
    pub fn encode(&self, registry: &Registry) -> Result<String> {
        let mut families = registry.gather();
        for family in &mut families {
            for metric in family.mut_metric() {
                let labels = metric
                    .take_label()
                    .into_iter()
                    .filter(|pair| !(pair.get_name() == USER_CAPACITY && pair.get_value().is_empty()))
                    .collect();
                metric.set_label(labels);
            }
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| Error::Internal(format!("Exposition output is not UTF-8: {}", e)))
    }

    /// Render and encode in one step.
    pub fn render_text(&self, snapshot: &Snapshot) -> Result<String> {
        let registry = self.render(snapshot)?;
        self.encode(&registry)
    }
}

fn declared_keys(samples: &[&MetricSample]) -> Vec<&'static str> {
    LABEL_KEYS
        .iter()
        .copied()
        .filter(|key| samples.iter().any(|s| s.label(key).is_some()))
        .collect()
}
