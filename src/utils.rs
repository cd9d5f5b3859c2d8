//! Utility Functions
//!
//! Capacity string parsing and power-of-two rounding.

use crate::error::{Error, Result};

/// Parse a capacity string (e.g., "100GB", "1Ti", "512") to bytes.
///
/// Units are binary multiples; a bare number is bytes.
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::CapacityParse("empty capacity string".into()));
    }

    // Find where the number ends and unit begins
    let num_end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit() && *c != '.')
        .map(|(i, _)| i)
        .unwrap_or(s.len());

    let num_str = &s[..num_end];
    let unit_str = s[num_end..].trim();

    let num: f64 = num_str
        .parse()
        .map_err(|_| Error::CapacityParse(format!("invalid number: {}", s)))?;

    let multiplier: u64 = match unit_str.to_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" | "KI" | "KIB" => 1 << 10,
        "M" | "MB" | "MI" | "MIB" => 1 << 20,
        "G" | "GB" | "GI" | "GIB" => 1 << 30,
        "T" | "TB" | "TI" | "TIB" => 1 << 40,
        "P" | "PB" | "PI" | "PIB" => 1 << 50,
        _ => {
            return Err(Error::CapacityParse(format!(
                "unknown unit: {}",
                unit_str
            )))
        }
    };

    Ok((num * multiplier as f64) as u64)
}

/// Smallest power of two greater than or equal to `value`, never below 1.
///
/// Saturates at the largest `u32` power of two.
pub fn next_power_of_two(value: f64) -> u32 {
    const MAX: u32 = 1 << 31;
    if !(value > 1.0) {
        return 1;
    }
    if value >= MAX as f64 {
        return MAX;
    }
    (value.ceil() as u32).next_power_of_two()
}
