//! Lenient numeric parsing shared by the billing engine and the aggregations.

/// Parse a display string as a number.
///
/// Surrounding whitespace and `,` thousands separators are ignored. Blank,
/// non-numeric and non-finite input yields `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a display string as a number, treating anything unparseable as zero.
pub fn number_or_zero(raw: &str) -> f64 {
    parse_number(raw).unwrap_or(0.0)
}

/// Round half-to-even to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round_ties_even() / scale
}
