//! NVMe SMART/Health Information log.

use serde_json::Value;

use super::text::section;
use super::{AttributeExtractor, Extraction};

const HEALTH_LOG: &str = "nvme_smart_health_information_log";
const HEALTH_LOG_HEADER: &str = "SMART/Health Information (NVMe Log";

/// Every field of the health log becomes one attribute. Array fields such
/// as `temperature_sensors` expand to `<key>_1`, `<key>_2`, ...
#[derive(Debug, Default, Clone, Copy)]
pub struct NvmeExtractor;

impl AttributeExtractor for NvmeExtractor {
    fn from_json(&self, doc: &Value, out: &mut Extraction) {
        let log = match doc.get(HEALTH_LOG).and_then(Value::as_object) {
            Some(log) => log,
            None => return,
        };

        for (key, value) in log {
            match value {
                Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        out.push_json(format!("{}_{}", key, i + 1), item);
                    }
                }
                _ => out.push_json(key.as_str(), value),
            }
        }
    }

    fn from_text(&self, report: &str, out: &mut Extraction) {
        for line in section(report, HEALTH_LOG_HEADER) {
            if let Some((key, value)) = line.split_once(':') {
                out.push_text(key.trim(), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Attribute;
    use serde_json::json;

    #[test]
    fn test_json_health_log() {
        let doc = json!({
            HEALTH_LOG: {
                "critical_warning": 0,
                "temperature": 38,
                "available_spare": 100,
                "percentage_used": 2,
                "data_units_read": 1234567,
                "temperature_sensors": [38, 45]
            }
        });
        let mut out = Extraction::default();
        NvmeExtractor.from_json(&doc, &mut out);

        assert_eq!(out.attributes.len(), 7);
        assert!(out.attributes.contains(&Attribute::single("temperature", 38.0)));
        assert!(out.attributes.contains(&Attribute::single("temperature_sensors_1", 38.0)));
        assert!(out.attributes.contains(&Attribute::single("temperature_sensors_2", 45.0)));
        assert!(out.failures.is_empty());
    }

    #[test]
    fn test_json_non_numeric_rejected() {
        let doc = json!({HEALTH_LOG: {"temperature": 40, "vendor_blob": {"a": 1}}});
        let mut out = Extraction::default();
        NvmeExtractor.from_json(&doc, &mut out);

        assert_eq!(out.attributes, vec![Attribute::single("temperature", 40.0)]);
        assert_eq!(out.failures[0].field, "vendor_blob");
    }

    #[test]
    fn test_json_missing_log() {
        let mut out = Extraction::default();
        NvmeExtractor.from_json(&json!({"model_name": "X"}), &mut out);
        assert!(out.attributes.is_empty());
    }

    #[test]
    fn test_text_health_log() {
        let report = "\
=== START OF SMART DATA SECTION ===
SMART overall-health self-assessment test result: PASSED

SMART/Health Information (NVMe Log 0x02)
Critical Warning:                   0x00
Temperature:                        38 Celsius
Available Spare:                    100%
Data Units Read:                    1,234,567 [632 GB]
Power On Hours:                     8,760

Error Information (NVMe Log 0x01, 16 of 64 entries)
No Errors Logged
";
        let mut out = Extraction::default();
        NvmeExtractor.from_text(report, &mut out);

        assert_eq!(
            out.attributes,
            vec![
                Attribute::single("Critical Warning", 0.0),
                Attribute::single("Temperature", 38.0),
                Attribute::single("Available Spare", 100.0),
                Attribute::single("Data Units Read", 1_234_567.0),
                Attribute::single("Power On Hours", 8760.0),
            ]
        );
    }
}
