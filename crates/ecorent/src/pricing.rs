//! Totals, money display and lenient numeric input.
//!
//! Malformed numbers never fail: they fall back to the same defaults the
//! booking form has always used (price 0, quantity 1, duration 1).

use chrono::NaiveDateTime;

/// Seconds in one billing day.
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// `price_unit × quantity × duration`, rounded to cents.
#[must_use]
pub fn compute_total(price_unit: f64, quantity: u32, duration: f64) -> f64 {
    round_cents(price_unit * f64::from(quantity) * duration)
}

/// Round to two decimals.
#[must_use]
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Two-decimal display, e.g. `150.00`.
#[must_use]
pub fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

/// Parse a price; empty, invalid, negative or non-finite input gives 0.
///
/// A decimal comma is accepted.
#[must_use]
pub fn parse_amount(raw: &str) -> f64 {
    parse_number(raw).filter(|v| *v >= 0.0).unwrap_or(0.0)
}

/// Parse a quantity; anything but a positive integer gives 1.
#[must_use]
pub fn parse_quantity(raw: &str) -> u32 {
    raw.trim().parse::<u32>().ok().filter(|q| *q > 0).unwrap_or(1)
}

/// Parse a duration; anything but a positive number gives 1.
#[must_use]
pub fn parse_duration(raw: &str) -> f64 {
    parse_number(raw).filter(|d| *d > 0.0).unwrap_or(1.0)
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Whole rental days between pickup and return, rounded up.
///
/// Returns `None` when the return is not after the pickup, so no zero or
/// negative duration is ever produced.
#[must_use]
pub fn derive_duration_days(start: NaiveDateTime, end: NaiveDateTime) -> Option<u32> {
    let seconds = (end - start).num_seconds();
    if seconds <= 0 {
        return None;
    }
    let days = (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;
    u32::try_from(days.max(1)).ok()
}
