//! Attribute Parser
//!
//! Turns one device's smartctl output into identity fields, the overall
//! health verdict and a list of numeric attributes.
//!
//! smartctl's JSON output is preferred. Older smartctl builds only print the
//! human-readable report, so each protocol extractor also understands the
//! textual layout.
//!
//! # Architecture
//!
//! ```text
//! DiagnosticResult ──▶ Payload (JSON | text) ──▶ ProtocolType
//!                                                   │
//!                      ┌────────────────────────────┼───────────────┐
//!                      ▼                            ▼               ▼
//!               SataExtractor                ScsiExtractor    NvmeExtractor
//!                      └────────────────────────────┴───────────────┘
//!                                                   │
//!                                                   ▼
//!                                              ParsedDevice
//! ```
//!
//! Adding a protocol means adding an [`AttributeExtractor`] and a match arm
//! in [`extractor_for`].

pub mod numeric;
mod nvme;
mod sata;
mod scsi;
mod text;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::hardware::discovery::ProtocolType;
use crate::smartctl::DiagnosticResult;

pub use nvme::NvmeExtractor;
pub use sata::SataExtractor;
pub use scsi::ScsiExtractor;

/// Substituted for identity fields smartctl did not report.
pub const UNKNOWN: &str = "Unknown";

// =============================================================================
// Parsed Types
// =============================================================================

/// Identity fields of a device, re-derived on every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub model_family: String,
    pub model_name: String,
    pub serial_number: String,
    pub capacity_bytes: Option<u64>,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            model_family: UNKNOWN.to_string(),
            model_name: UNKNOWN.to_string(),
            serial_number: UNKNOWN.to_string(),
            capacity_bytes: None,
        }
    }
}

/// One named health measurement.
///
/// SATA rows carry both a normalized and a raw value; SCSI and NVMe fields
/// carry a single value, stored as `normalized`. At least one of the two is
/// always present.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub normalized: Option<f64>,
    pub raw: Option<f64>,
}

impl Attribute {
    /// Build an attribute, or `None` if it has no numeric value at all.
    pub fn new(name: impl Into<String>, normalized: Option<f64>, raw: Option<f64>) -> Option<Self> {
        if normalized.is_none() && raw.is_none() {
            return None;
        }
        Some(Self {
            name: name.into(),
            normalized,
            raw,
        })
    }

    /// A single-valued attribute.
    pub fn single(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            normalized: Some(value),
            raw: None,
        }
    }
}

/// A field that was dropped because it held no numeric value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub field: String,
    pub value: String,
}

/// Everything extracted from one diagnostic result.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDevice {
    pub identity: Identity,
    pub protocol: ProtocolType,
    /// `None` when the output carried no health verdict
    pub smart_passed: Option<bool>,
    pub attributes: Vec<Attribute>,
    pub failures: Vec<ParseFailure>,
    /// Error-severity messages smartctl attached to its report
    pub errors: Vec<String>,
}

impl ParsedDevice {
    /// Stand-in for a device whose invocation produced nothing to parse.
    pub fn unavailable(protocol: ProtocolType) -> Self {
        Self {
            identity: Identity::default(),
            protocol,
            smart_passed: None,
            attributes: Vec::new(),
            failures: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Whether the report said anything about the device itself. smartctl
    /// answers an unopenable device with only its error envelope.
    pub fn has_device_data(&self) -> bool {
        self.identity != Identity::default()
            || self.smart_passed.is_some()
            || !self.attributes.is_empty()
            || !self.failures.is_empty()
    }
}

// =============================================================================
// Extraction
// =============================================================================

/// Accumulates attributes and rejected fields for one device.
#[derive(Debug, Default)]
pub struct Extraction {
    pub attributes: Vec<Attribute>,
    pub failures: Vec<ParseFailure>,
}

impl Extraction {
    pub fn push(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    pub fn reject(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.failures.push(ParseFailure {
            field: field.into(),
            value: value.into(),
        });
    }

    /// Add a single-valued attribute from a JSON value, rejecting it if the
    /// value is not numeric.
    pub fn push_json(&mut self, name: impl Into<String>, value: &Value) {
        let name = name.into();
        match numeric::json_number(value) {
            Some(v) => self.push(Attribute::single(name, v)),
            None => self.reject(name, value.to_string()),
        }
    }

    /// Add a single-valued attribute from text, rejecting it if the text has
    /// no leading number.
    pub fn push_text(&mut self, name: impl Into<String>, value: &str) {
        let name = name.into();
        match numeric::leading_number(value) {
            Some(v) => self.push(Attribute::single(name, v)),
            None => self.reject(name, value.trim()),
        }
    }
}

/// Extraction contract shared by every protocol family.
pub trait AttributeExtractor: Send + Sync {
    /// Extract attributes from smartctl's JSON document.
    fn from_json(&self, doc: &Value, out: &mut Extraction);

    /// Extract attributes from smartctl's text report.
    fn from_text(&self, report: &str, out: &mut Extraction);
}

/// Pick the extractor for a protocol. `Unknown` has none.
pub fn extractor_for(protocol: ProtocolType) -> Option<&'static dyn AttributeExtractor> {
    static SATA: SataExtractor = SataExtractor;
    static SCSI: ScsiExtractor = ScsiExtractor;
    static NVME: NvmeExtractor = NvmeExtractor;

    match protocol {
        ProtocolType::Sata => Some(&SATA),
        ProtocolType::Scsi => Some(&SCSI),
        ProtocolType::Nvme => Some(&NVME),
        ProtocolType::Unknown => None,
    }
}

// =============================================================================
// Payload
// =============================================================================

/// Decoded smartctl output.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    /// JSON when the output is a JSON object, text otherwise.
    pub fn decode(raw: &str) -> Self {
        if raw.trim_start().starts_with('{') {
            if let Ok(doc @ Value::Object(_)) = serde_json::from_str::<Value>(raw) {
                return Payload::Json(doc);
            }
        }
        Payload::Text(raw.to_string())
    }

    fn protocol(&self) -> ProtocolType {
        match self {
            Payload::Json(doc) => doc
                .pointer("/device/protocol")
                .and_then(Value::as_str)
                .map(ProtocolType::from_protocol)
                .unwrap_or(ProtocolType::Unknown),
            Payload::Text(report) => text::protocol(report),
        }
    }

    fn identity(&self) -> Identity {
        match self {
            Payload::Json(doc) => json_identity(doc),
            Payload::Text(report) => text::identity(report),
        }
    }

    fn smart_passed(&self) -> Option<bool> {
        match self {
            Payload::Json(doc) => doc.pointer("/smart_status/passed").and_then(Value::as_bool),
            Payload::Text(report) => text::smart_passed(report),
        }
    }

    fn errors(&self) -> Vec<String> {
        let Payload::Json(doc) = self else {
            return Vec::new();
        };
        doc.pointer("/smartctl/messages")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter(|m| m.get("severity").and_then(Value::as_str) == Some("error"))
            .filter_map(|m| m.get("string").and_then(Value::as_str))
            .map(|s| s.trim().to_string())
            .collect()
    }
}

fn json_string(doc: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| doc.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn json_identity(doc: &Value) -> Identity {
    // SAS drives report scsi_model_name on newer smartctl releases
    let model_name = json_string(doc, &["scsi_model_name", "model_name", "scsi_product"]);

    let capacity_bytes = doc
        .pointer("/user_capacity/bytes")
        .or_else(|| doc.get("nvme_total_capacity"))
        .and_then(Value::as_u64)
        .filter(|bytes| *bytes > 0);

    Identity {
        model_family: json_string(doc, &["model_family"]).unwrap_or_else(|| UNKNOWN.to_string()),
        model_name: model_name.unwrap_or_else(|| UNKNOWN.to_string()),
        serial_number: json_string(doc, &["serial_number"]).unwrap_or_else(|| UNKNOWN.to_string()),
        capacity_bytes,
    }
}

// =============================================================================
// Parse
// =============================================================================

/// Parse one diagnostic result.
///
/// Returns [`Error::InvocationFailed`] when smartctl produced no output at
/// all. Otherwise always succeeds: missing identity fields become
/// [`UNKNOWN`], a missing verdict becomes `None`, and non-numeric attribute
/// values land in `failures`.
#[instrument(skip(result), fields(drive = %result.device.path, exit_code = result.exit_code))]
pub fn parse(result: &DiagnosticResult) -> Result<ParsedDevice> {
    if !result.has_output() {
        return Err(Error::InvocationFailed {
            device: result.device.path.clone(),
            exit_code: result.exit_code,
        });
    }

    let payload = Payload::decode(&result.raw_output);

    let protocol = match payload.protocol() {
        ProtocolType::Unknown => result.device.protocol,
        protocol => protocol,
    };

    let mut extraction = Extraction::default();
    if let Some(extractor) = extractor_for(protocol) {
        match &payload {
            Payload::Json(doc) => extractor.from_json(doc, &mut extraction),
            Payload::Text(report) => extractor.from_text(report, &mut extraction),
        }
    }

    debug!(
        protocol = %protocol,
        attributes = extraction.attributes.len(),
        rejected = extraction.failures.len(),
        "Parsed smartctl output"
    );

    Ok(ParsedDevice {
        identity: payload.identity(),
        protocol,
        smart_passed: payload.smart_passed(),
        attributes: extraction.attributes,
        failures: extraction.failures,
        errors: payload.errors(),
    })
}
