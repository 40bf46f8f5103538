//! Lenient conversion of spreadsheet and form input into canonical values.
//!
//! None of these functions fail. Malformed input collapses to a default
//! (`0` or `None`), so a caller that needs to tell "unparseable" apart from
//! "genuinely zero" must use [`parse_amount`] instead of [`normalize_amount`].

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Default pattern accepted by [`normalize_date`].
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const CURRENCY_MARKER: &str = "R$";

/// Parse a monetary amount, accepting Brazilian formatting (`1.200,50`).
///
/// Empty input is `Some(0)`; anything that cannot be read as a number is `None`.
pub fn parse_amount(input: Option<&str>) -> Option<Decimal> {
    let raw = match input {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Some(Decimal::ZERO),
    };

    let mut cleaned: String = raw
        .replace(CURRENCY_MARKER, "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if cleaned.contains(',') && cleaned.contains('.') {
        cleaned = cleaned.replace('.', "").replace(',', ".");
    } else if cleaned.contains(',') {
        cleaned = cleaned.replace(',', ".");
    }

    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Like [`parse_amount`], but unparseable input becomes `0`.
pub fn normalize_amount(input: Option<&str>) -> Decimal {
    parse_amount(input).unwrap_or(Decimal::ZERO)
}

/// Parse an integer through a float intermediate so `"12.0"` is accepted.
/// Fractions truncate toward zero; anything else becomes `0`.
pub fn normalize_int(input: Option<&str>) -> i64 {
    let raw = match input {
        Some(s) if !s.trim().is_empty() => s.trim(),
        _ => return 0,
    };

    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => v.trunc() as i64,
        _ => 0,
    }
}

/// Parse a date with the given `chrono` format, `None` when empty or invalid.
pub fn normalize_date(input: Option<&str>, format: &str) -> Option<NaiveDate> {
    let raw = input.map(str::trim).filter(|s| !s.is_empty())?;
    NaiveDate::parse_from_str(raw, format).ok()
}

/// Keep only the ASCII digits of `input`.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// True when `input` is non-empty and made of ASCII digits only.
pub fn is_all_digits(input: &str) -> bool {
    !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit())
}
