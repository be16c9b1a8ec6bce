//! SCSI/SAS log pages.
//!
//! SAS drives have no attribute table. The useful health data is spread
//! over several log pages: temperature, power-on time, the grown defect
//! list, start/stop cycle counters and the per-operation error counters.

use serde_json::Value;

use super::text::{fields, section};
use super::{AttributeExtractor, Extraction};

/// Columns of the text error counter log, in report order.
const ERROR_COUNTER_COLUMNS: [&str; 7] = [
    "errors_corrected_by_eccfast",
    "errors_corrected_by_eccdelayed",
    "errors_corrected_by_rereads_rewrites",
    "total_errors_corrected",
    "correction_algorithm_invocations",
    "gigabytes_processed",
    "total_uncorrected_errors",
];

const ERROR_COUNTER_OPERATIONS: [&str; 3] = ["read", "write", "verify"];

/// Single-valued text fields and the attribute name each maps to.
const TEXT_FIELDS: [(&str, &str); 6] = [
    ("Current Drive Temperature", "temperature"),
    ("Drive Trip Temperature", "temperature_drive_trip"),
    ("Elements in grown defect list", "grown_defect_list"),
    ("Accumulated start-stop cycles", "accumulated_start_stop_cycles"),
    ("Accumulated load-unload cycles", "accumulated_load_unload_cycles"),
    ("Percentage used endurance indicator", "percentage_used_endurance_indicator"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct ScsiExtractor;

impl AttributeExtractor for ScsiExtractor {
    fn from_json(&self, doc: &Value, out: &mut Extraction) {
        let single = [
            ("/temperature/current", "temperature"),
            ("/temperature/drive_trip", "temperature_drive_trip"),
            ("/power_on_time/hours", "power_on_hours"),
            ("/scsi_grown_defect_list", "grown_defect_list"),
            (
                "/scsi_percentage_used_endurance_indicator",
                "percentage_used_endurance_indicator",
            ),
        ];
        for (pointer, name) in single {
            if let Some(value) = doc.pointer(pointer) {
                out.push_json(name, value);
            }
        }

        if let Some(counters) = doc
            .get("scsi_start_stop_cycle_counter")
            .and_then(Value::as_object)
        {
            for (key, value) in counters {
                out.push_json(key.as_str(), value);
            }
        }

        for op in ERROR_COUNTER_OPERATIONS {
            let counters = match doc
                .pointer(&format!("/scsi_error_counter_log/{}", op))
                .and_then(Value::as_object)
            {
                Some(counters) => counters,
                None => continue,
            };
            for (key, value) in counters {
                out.push_json(format!("{}_{}", op, key), value);
            }
        }
    }

    fn from_text(&self, report: &str, out: &mut Extraction) {
        for (key, value) in fields(report) {
            if let Some((_, name)) = TEXT_FIELDS
                .iter()
                .find(|(label, _)| key.eq_ignore_ascii_case(label))
            {
                out.push_text(*name, value);
            } else if key.starts_with("Accumulated power on time") {
                // "hours:minutes 24299:04"
                let hours = value
                    .split_whitespace()
                    .last()
                    .and_then(|hm| hm.split(':').next())
                    .unwrap_or(value);
                out.push_text("power_on_hours", hours);
            }
        }

        for line in section(report, "Error counter log:") {
            let (op, counts) = match line.trim().split_once(':') {
                Some((op, counts)) if ERROR_COUNTER_OPERATIONS.contains(&op.trim()) => {
                    (op.trim(), counts)
                }
                _ => continue,
            };
            for (column, value) in ERROR_COUNTER_COLUMNS.iter().zip(counts.split_whitespace()) {
                out.push_text(format!("{}_{}", op, column), value);
            }
        }
    }
}
