//! Numeric boundary between loosely-typed wizard answers and the engine.
//!
//! Form fields arrive either as JSON numbers or as whatever the user typed
//! ("$90,000", "6.5%", ""). Everything past this module works on `Decimal`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;
use crate::types::{Money, Rate, Years};
use crate::EngineResult;

/// Largest amount accepted from a form field.
pub const MAX_AMOUNT: Money = dec!(1_000_000_000_000);

/// A numeric form field as supplied by the caller.
///
/// JSON numbers become `Number`; JSON strings stay `Text` so that what the
/// user typed is interpreted by the parse functions below.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AmountField {
    Number(Decimal),
    Text(String),
}

impl<'de> Deserialize<'de> for AmountField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountFieldVisitor)
    }
}

struct AmountFieldVisitor;

impl<'de> Visitor<'de> for AmountFieldVisitor {
    type Value = AmountField;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number or a numeric string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<AmountField, E> {
        Ok(AmountField::Number(Decimal::from(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<AmountField, E> {
        Ok(AmountField::Number(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<AmountField, E> {
        // Non-finite or out-of-range floats are kept as text and rejected by the parsers.
        Ok(Decimal::from_str(&v.to_string())
            .map(AmountField::Number)
            .unwrap_or_else(|_| AmountField::Text(v.to_string())))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<AmountField, E> {
        Ok(AmountField::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<AmountField, E> {
        Ok(AmountField::Text(v))
    }
}

impl From<Decimal> for AmountField {
    fn from(value: Decimal) -> Self {
        AmountField::Number(value)
    }
}

impl From<&str> for AmountField {
    fn from(value: &str) -> Self {
        AmountField::Text(value.to_string())
    }
}

/// Strip currency formatting the wizard allows in free-text amount fields.
pub fn clean_numeric_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '$' | ',' | '_' | '%') && !c.is_whitespace())
        .collect()
}

/// Parse a non-negative monetary amount.
pub fn parse_amount(field: &str, value: &AmountField) -> EngineResult<Money> {
    let amount = match value {
        AmountField::Number(n) => *n,
        AmountField::Text(raw) => {
            let cleaned = clean_numeric_text(raw);
            if cleaned.is_empty() {
                return Err(EngineError::invalid_numeric(field, "value is empty"));
            }
            Decimal::from_str(&cleaned).map_err(|_| {
                EngineError::invalid_numeric(field, format!("'{raw}' is not a number"))
            })?
        }
    };

    if amount < Decimal::ZERO {
        return Err(EngineError::invalid_numeric(field, "value cannot be negative"));
    }
    if amount > MAX_AMOUNT {
        return Err(EngineError::invalid_numeric(field, "value is too large"));
    }
    Ok(amount)
}

/// Parse an amount that may be absent; absence is itself an invalid input.
pub fn parse_optional_amount(field: &str, value: Option<&AmountField>) -> EngineResult<Money> {
    match value {
        Some(v) => parse_amount(field, v),
        None => Err(EngineError::invalid_numeric(field, "value is missing")),
    }
}

/// Parse an annual interest rate.
///
/// Text is always percentage points ("6.5", "0.99%"). A JSON number of 1 or
/// more is percentage points too; a smaller number is already a decimal.
/// Rates above 100% are rejected.
pub fn parse_rate(field: &str, value: &AmountField) -> EngineResult<Rate> {
    let raw = parse_amount(field, value)?;
    let rate = match value {
        AmountField::Text(_) => raw / dec!(100),
        AmountField::Number(_) if raw >= Decimal::ONE => raw / dec!(100),
        AmountField::Number(_) => raw,
    };
    if rate > Decimal::ONE {
        return Err(EngineError::invalid_numeric(field, "rate cannot exceed 100%"));
    }
    Ok(rate)
}

/// Parse a whole number of years in `1..=max`.
pub fn parse_years(field: &str, value: &AmountField, max: Years) -> EngineResult<Years> {
    let years = parse_amount(field, value)?;
    if years != years.trunc() {
        return Err(EngineError::invalid_numeric(field, "must be a whole number of years"));
    }
    if years < Decimal::ONE || years > Decimal::from(max) {
        return Err(EngineError::invalid_numeric(
            field,
            format!("must be between 1 and {max} years"),
        ));
    }
    years
        .to_u32()
        .ok_or_else(|| EngineError::invalid_numeric(field, "must be a whole number of years"))
}

// ---------------------------------------------------------------------------
// Checked arithmetic
// ---------------------------------------------------------------------------

/// `a * b`, or an `InvalidNumericInput` on `field` when the product overflows.
pub fn checked_mul(field: &str, a: Decimal, b: Decimal) -> EngineResult<Decimal> {
    a.checked_mul(b)
        .ok_or_else(|| EngineError::invalid_numeric(field, "value is too large"))
}

/// `a / b`, or an `InvalidNumericInput` on `field` on overflow or a zero divisor.
pub fn checked_div(field: &str, a: Decimal, b: Decimal) -> EngineResult<Decimal> {
    a.checked_div(b)
        .ok_or_else(|| EngineError::invalid_numeric(field, "value is too large"))
}

pub fn checked_add(field: &str, a: Decimal, b: Decimal) -> EngineResult<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| EngineError::invalid_numeric(field, "value is too large"))
}
