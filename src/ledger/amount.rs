use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::Error;

/// A strictly positive amount of money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(Decimal);

impl Amount {
    /// Wrap `value` as an amount.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidAmount] if `value` is zero or negative.
    pub fn new(value: Decimal) -> Result<Self, Error> {
        if value <= Decimal::ZERO {
            return Err(Error::InvalidAmount);
        }

        Ok(Self(value))
    }

    /// Parse the `amount` field of a request body.
    ///
    /// Clients send either a JSON number (`250.5`) or a numeric string
    /// (`"250.50"`). Anything else, including `null`, booleans and strings
    /// such as `"NaN"` or `"12abc"`, is rejected.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidAmount] if the value is missing, not numeric, or
    /// not greater than zero.
    pub fn parse(value: Option<&Value>) -> Result<Self, Error> {
        let decimal = match value {
            Some(Value::Number(number)) => parse_decimal(&number.to_string()),
            Some(Value::String(text)) => parse_decimal(text.trim()),
            _ => None,
        }
        .ok_or(Error::InvalidAmount)?;

        Self::new(decimal)
    }

    /// The amount as a decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

/// Whether `text` is a plain decimal literal with an optional sign and exponent,
/// e.g. "-12.5" or "1.2e3".
fn is_numeric_literal(text: &str) -> bool {
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(index) => (&text[..index], Some(&text[index + 1..])),
        None => (text, None),
    };

    let mantissa = mantissa.strip_prefix(['+', '-']).unwrap_or(mantissa);
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let is_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());

    if whole.is_empty() && fraction.is_empty() || !is_digits(whole) || !is_digits(fraction) {
        return false;
    }

    match exponent {
        None => true,
        Some(exponent) => {
            let exponent = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
            !exponent.is_empty() && is_digits(exponent)
        }
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    if !is_numeric_literal(text) {
        return None;
    }

    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}
