pub mod calculate;
pub mod compare;
pub mod components;
pub mod lookup;
pub mod what_if;

use rust_decimal::Decimal;
use std::str::FromStr;

use affordability_core::input::{parse_rate, AmountField};

/// A rate flag as a form field. A bare number keeps the decimal form
/// ("0.065"); anything else is read as percentage points.
pub fn rate_input(raw: &str) -> AmountField {
    match Decimal::from_str(raw.trim()) {
        Ok(n) => AmountField::Number(n),
        Err(_) => AmountField::from(raw),
    }
}

/// Parse a rate flag: "6.5", "6.5%" and "0.065" all mean 6.5%.
pub fn rate_flag(flag: &str, raw: &str) -> Result<Decimal, Box<dyn std::error::Error>> {
    Ok(parse_rate(flag, &rate_input(raw))?)
}
