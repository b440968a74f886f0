//! Small shared helpers for rounding and TSV field formatting.

use std::fmt::Display;

/// Null placeholder used in every TSV output file.
pub const PLACEHOLDER: &str = ".";

/// Rounds to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounds to one decimal place, half away from zero.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Formats an optional TSV field, substituting [`PLACEHOLDER`] for null.
pub fn fmt_field<T: Display>(value: Option<T>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => PLACEHOLDER.to_string(),
    }
}
