//! ATA/SATA attribute table.

use serde_json::Value;

use super::numeric::{json_number, leading_number};
use super::{Attribute, AttributeExtractor, Extraction};

/// Header that opens the attribute table in the text report.
const TABLE_HEADER: &str = "ID# ATTRIBUTE_NAME";

/// Reads the vendor attribute table, one attribute per row with both the
/// normalized value and the raw value.
#[derive(Debug, Default, Clone, Copy)]
pub struct SataExtractor;

impl AttributeExtractor for SataExtractor {
    fn from_json(&self, doc: &Value, out: &mut Extraction) {
        let rows = match doc
            .pointer("/ata_smart_attributes/table")
            .and_then(Value::as_array)
        {
            Some(rows) => rows,
            None => return,
        };

        for row in rows {
            let name = match row.get("name").and_then(Value::as_str).map(str::trim) {
                Some(name) if !name.is_empty() => name,
                _ => {
                    out.reject("ata_smart_attributes.table", row.to_string());
                    continue;
                }
            };

            let normalized = row.get("value").and_then(json_number);
            // The raw string keeps vendor formatting; the first number in it
            // is what the drive reports, the packed integer may not be.
            let raw = row
                .pointer("/raw/string")
                .and_then(Value::as_str)
                .and_then(leading_number)
                .or_else(|| row.pointer("/raw/value").and_then(json_number));

            match Attribute::new(name, normalized, raw) {
                Some(attribute) => out.push(attribute),
                None => out.reject(name, row.to_string()),
            }
        }
    }

    fn from_text(&self, report: &str, out: &mut Extraction) {
        let mut lines = report
            .lines()
            .skip_while(|line| !line.trim_start().starts_with(TABLE_HEADER));

        let header: Vec<&str> = match lines.next() {
            Some(line) => line.split_whitespace().collect(),
            None => return,
        };
        let value_col = header.iter().position(|h| *h == "VALUE").unwrap_or(3);
        let raw_col = header.len().saturating_sub(1);

        for line in lines.take_while(|line| !line.trim().is_empty()) {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let name = match tokens.get(1) {
                Some(name) => *name,
                None => continue,
            };

            let normalized = tokens.get(value_col).and_then(|t| leading_number(t));
            let raw_text = tokens.get(raw_col..).map(|t| t.join(" ")).unwrap_or_default();
            let raw = leading_number(&raw_text);

            match Attribute::new(name, normalized, raw) {
                Some(attribute) => out.push(attribute),
                None => out.reject(name, line.trim()),
            }
        }
    }
}
