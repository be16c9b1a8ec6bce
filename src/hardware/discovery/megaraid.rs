//! MegaRAID Discovery
//!
//! Drives behind a MegaRAID controller are not addressable by their own
//! block device. smartctl reaches them through the controller bus path plus
//! a `-d megaraid,N` selector, so each physical drive gets the synthetic
//! identifier `megaraid,N`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Device type a scan reports for a controller whose drives are not yet expanded.
pub const CONTROLLER_TYPE: &str = "megaraid";

static DRIVE_TYPE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:sat\+)?megaraid,(\d+)$").expect("valid megaraid pattern"));

/// Synthetic identifier for drive `index` (`megaraid,N`).
pub fn drive_id(index: u32) -> String {
    format!("{},{}", CONTROLLER_TYPE, index)
}

/// Extract the drive index from a scan type such as `megaraid,3` or
/// `sat+megaraid,3`.
pub fn drive_index(device_type: &str) -> Option<u32> {
    DRIVE_TYPE_PATTERN
        .captures(device_type.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Whether a scan entry names a controller that needs a follow-up scan.
pub fn is_controller(device_type: &str) -> bool {
    device_type.trim().eq_ignore_ascii_case(CONTROLLER_TYPE)
}
