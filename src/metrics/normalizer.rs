//! Metrics Normalizer
//!
//! Maps one device's parsed facts to labeled, uniquely named metric samples.
//!
//! Attribute names come straight from drive firmware and smartctl, so they
//! are sanitized into Prometheus-safe identifiers. Two attributes that end
//! up with the same identifier on one device are both kept: the later ones
//! get a numeric suffix (`_2`, `_3`, ...) in the order they were reported.

use std::collections::HashSet;

use tracing::debug;

use crate::hardware::discovery::Device;
use crate::parser::{ParseFailure, ParsedDevice};

/// Prefix carried by every exported metric.
pub const METRIC_PREFIX: &str = "smartprom_";

/// Overall health verdict, 1 when passed.
pub const SMART_PASSED: &str = "smart_passed";

/// smartctl exit status of the info call.
pub const EXIT_CODE: &str = "exit_code";

/// Appended to the metric carrying an attribute's raw value.
pub const RAW_SUFFIX: &str = "_raw";

/// The only label a sample may lack.
pub const USER_CAPACITY: &str = "user_capacity";

/// Label keys in the order they are attached to every sample.
pub const LABEL_KEYS: [&str; 6] = [
    "drive",
    "type",
    "model_family",
    "model_name",
    "serial_number",
    USER_CAPACITY,
];

/// Ordered label pairs. Keys are always a prefix-preserving subset of
/// [`LABEL_KEYS`].
pub type Labels = Vec<(&'static str, String)>;

/// One emission-ready gauge observation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    /// Full metric name including [`METRIC_PREFIX`]
    pub name: String,
    pub labels: Labels,
    pub value: f64,
}

impl MetricSample {
    /// Value of a label, if present.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Samples for one device plus attribute names that could not be turned
/// into a metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub samples: Vec<MetricSample>,
    pub rejected: Vec<ParseFailure>,
}

/// Lowercase, collapse every run of non-alphanumeric characters into a
/// single `_`, and strip leading/trailing underscores.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    out
}

/// Help text for a metric family.
pub fn help_text(name: &str) -> String {
    let base = name.strip_prefix(METRIC_PREFIX).unwrap_or(name);
    match base {
        SMART_PASSED => "SMART overall-health self-assessment (1 = passed, 0 = failed)".to_string(),
        EXIT_CODE => "Exit status of the last smartctl info call".to_string(),
        _ if base.ends_with(RAW_SUFFIX) => format!(
            "Raw value of SMART attribute {}",
            &base[..base.len() - RAW_SUFFIX.len()]
        ),
        _ => format!("SMART attribute {}", base),
    }
}

/// Per-device name registry. Meta metric names are reserved up front so an
/// attribute can never shadow them.
struct NameSet {
    taken: HashSet<String>,
}

impl NameSet {
    fn new() -> Self {
        Self {
            taken: [SMART_PASSED, EXIT_CODE].iter().map(|s| s.to_string()).collect(),
        }
    }

    fn claim(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        (2u32..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| self.taken.insert(candidate.clone()))
            .unwrap_or_else(|| base.to_string())
    }
}

/// Label set shared by every sample of one device.
pub fn device_labels(device: &Device, parsed: &ParsedDevice) -> Labels {
    let identity = &parsed.identity;
    let mut labels: Labels = vec![
        ("drive", device.path.clone()),
        ("type", device.type_label(parsed.protocol)),
        ("model_family", identity.model_family.clone()),
        ("model_name", identity.model_name.clone()),
        ("serial_number", identity.serial_number.clone()),
    ];
    if let Some(bytes) = identity.capacity_bytes {
        labels.push((USER_CAPACITY, bytes.to_string()));
    }
    labels
}

/// Turn one device's parsed output into metric samples.
///
/// `exit_code` is always emitted and `smart_passed` whenever a verdict was
/// found, even when no attribute survived parsing. An attribute yields its
/// normalized value under its sanitized name and, when the raw value is
/// present and differs, a second `_raw` sample.
pub fn normalize(device: &Device, parsed: &ParsedDevice, exit_code: i32) -> Normalized {
    let labels = device_labels(device, parsed);
    let mut names = NameSet::new();
    let mut out = Normalized::default();

    let sample = |name: &str, value: f64| MetricSample {
        name: format!("{}{}", METRIC_PREFIX, name),
        labels: labels.clone(),
        value,
    };

    if let Some(passed) = parsed.smart_passed {
        out.samples
            .push(sample(SMART_PASSED, if passed { 1.0 } else { 0.0 }));
    }
    out.samples.push(sample(EXIT_CODE, exit_code as f64));

    for attribute in &parsed.attributes {
        let base = sanitize(&attribute.name);
        if base.is_empty() {
            out.rejected.push(ParseFailure {
                field: attribute.name.clone(),
                value: "name has no alphanumeric characters".to_string(),
            });
            continue;
        }

        let name = names.claim(&base);
        if name != base {
            debug!(drive = %device.path, attribute = %attribute.name, metric = %name, "Disambiguated colliding attribute name");
        }

        if let Some(value) = attribute.normalized {
            out.samples.push(sample(&name, value));
        }

        if let Some(raw) = attribute.raw {
            if attribute.normalized != Some(raw) {
                let raw_name = names.claim(&format!("{}{}", name, RAW_SUFFIX));
                out.samples.push(sample(&raw_name, raw));
            }
        }
    }

    out
}
