//! Helpers for smartctl's human-readable report.

use super::numeric::leading_number;
use super::{Identity, UNKNOWN};
use crate::hardware::discovery::ProtocolType;

/// `Key: value` pairs, split at the first colon.
pub(super) fn fields(report: &str) -> impl Iterator<Item = (&str, &str)> {
    report
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
}

/// First non-empty value whose key matches one of `keys`, ignoring case.
pub(super) fn field<'a>(report: &'a str, keys: &[&str]) -> Option<&'a str> {
    fields(report)
        .find(|(key, value)| !value.is_empty() && keys.iter().any(|k| key.eq_ignore_ascii_case(k)))
        .map(|(_, value)| value)
}

/// Lines following the line that starts with `header`, up to the next blank
/// line.
pub(super) fn section<'a>(report: &'a str, header: &str) -> Vec<&'a str> {
    report
        .lines()
        .skip_while(|line| !line.trim_start().starts_with(header))
        .skip(1)
        .take_while(|line| !line.trim().is_empty())
        .collect()
}

pub(super) fn protocol(report: &str) -> ProtocolType {
    if report.contains("SMART/Health Information (NVMe Log")
        || field(report, &["NVMe Version"]).is_some()
    {
        ProtocolType::Nvme
    } else if report.contains("ID# ATTRIBUTE_NAME")
        || field(report, &["ATA Version is", "SATA Version is"]).is_some()
    {
        ProtocolType::Sata
    } else if field(report, &["Transport protocol", "SMART Health Status"]).is_some() {
        ProtocolType::Scsi
    } else {
        ProtocolType::Unknown
    }
}

pub(super) fn identity(report: &str) -> Identity {
    let capacity_bytes = field(
        report,
        &["User Capacity", "Total NVM Capacity", "Namespace 1 Size/Capacity"],
    )
    .and_then(leading_number)
    .filter(|bytes| *bytes > 0.0)
    .map(|bytes| bytes as u64);

    Identity {
        model_family: text_field(report, &["Model Family"]),
        model_name: text_field(report, &["Device Model", "Model Number", "Product"]),
        serial_number: text_field(report, &["Serial Number"]),
        capacity_bytes,
    }
}

fn text_field(report: &str, keys: &[&str]) -> String {
    field(report, keys).unwrap_or(UNKNOWN).to_string()
}

pub(super) fn smart_passed(report: &str) -> Option<bool> {
    if let Some(result) = field(report, &["SMART overall-health self-assessment test result"]) {
        return Some(result.eq_ignore_ascii_case("PASSED"));
    }
    field(report, &["SMART Health Status"]).map(|status| status.eq_ignore_ascii_case("OK"))
}
