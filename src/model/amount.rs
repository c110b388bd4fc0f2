//! Amount type for handling monetary values entered as free-form text.
//!
//! This module provides the `Amount` type which wraps `Decimal` and handles parsing values that
//! may or may not include a currency symbol (`₹` or `$`) and thousands separators. It also
//! provides `parse_amount`, the single entry point used to validate user-entered amounts.

use anyhow::{bail, Context};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::Res;

/// The currency symbol used when displaying amounts.
pub const CURRENCY: &str = "₹";

/// The largest amount accepted from user input, one lakh crore.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Amounts are whole paise.
pub const MAX_DECIMAL_PLACES: u32 = 2;

/// Represents how amounts were (or should be) formatted.
///
/// # Examples
///  - `AmountFormat{ symbol: true, commas: true }` -> `₹60,000.00`
///  - `AmountFormat{ symbol: false, commas: true }` -> `60,000.00`
///  - `AmountFormat{ symbol: false, commas: false }` -> `60000.00`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AmountFormat {
    /// Whether a currency symbol is present in the formatting.
    symbol: bool,
    /// Whether commas are present as thousands separators in the formatting.
    commas: bool,
}

impl Default for AmountFormat {
    fn default() -> Self {
        DEFAULT_FORMAT
    }
}

const DEFAULT_FORMAT: AmountFormat = AmountFormat {
    symbol: true,
    commas: true,
};

/// A money amount.
///
/// Formatting is considered significant for the purposes of equality, so for numeric comparisons
/// you should access the `Decimal` value and use that.
///
/// ```
/// # use eduwallet::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("1200.50").unwrap();
/// let b = Amount::from_str("₹1,200.50").unwrap();
/// assert_ne!(a, b);
/// assert_eq!(a.value(), b.value());
/// assert_eq!(b.to_string(), "₹1,200.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    value: Decimal,
    format: AmountFormat,
}

impl Amount {
    /// Creates a new Amount with the default display format, e.g. `₹1,200.50`.
    pub const fn new(value: Decimal) -> Self {
        Self {
            value,
            format: DEFAULT_FORMAT,
        }
    }

    /// Creates a new Amount that displays as a bare number with two decimal places.
    pub const fn plain(value: Decimal) -> Self {
        Self {
            value,
            format: AmountFormat {
                symbol: false,
                commas: false,
            },
        }
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.value.is_sign_positive()
    }

    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.value.is_sign_negative()
    }

    /// Parses `s` as an amount, returning zero (and logging a warning) when it is not numeric.
    ///
    /// This is how stored amounts are read back: a single corrupt row must not make a total
    /// impossible to compute.
    pub fn lenient(s: &str) -> Decimal {
        match Amount::from_str(s) {
            Ok(amount) => amount.value(),
            Err(e) => {
                warn!("Treating unparsable amount '{s}' as 0: {e}");
                Decimal::ZERO
            }
        }
    }
}

/// An error that can occur when parsing strings into amounts.
#[derive(Debug)]
pub struct AmountError(String);

impl fmt::Display for AmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a valid amount", self.0)
    }
}

impl std::error::Error for AmountError {}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AmountError(s.to_string()));
        }

        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (symbol, number) = match unsigned
            .strip_prefix(CURRENCY)
            .or_else(|| unsigned.strip_prefix('$'))
        {
            Some(rest) => (true, rest.trim_start()),
            None => (false, unsigned),
        };

        let without_commas = number.replace(',', "");
        let commas = without_commas.len() < number.len();

        let value =
            Decimal::from_str(&without_commas).map_err(|_| AmountError(s.to_string()))?;
        let value = if negative { -value } else { value };
        Ok(Amount {
            value,
            format: AmountFormat { symbol, commas },
        })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let num = self.value.abs().round_dp(2);
        let symbol = if self.format.symbol { CURRENCY } else { "" };

        if self.format.commas {
            write!(
                f,
                "{sign}{symbol}{}",
                format_num::format_num!(",.2", num.to_f64().unwrap_or_default())
            )
        } else {
            write!(f, "{sign}{symbol}{num:.2}")
        }
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

/// Parses user-entered text into a decimal amount. This is the one place where free-form amount
/// text is validated before a write.
///
/// # Errors
/// - The text is empty or not a number.
/// - The amount has more than two decimal places.
/// - The amount is larger than `MAX_AMOUNT` in either direction.
pub fn parse_amount(text: &str) -> Res<Decimal> {
    let value = Amount::from_str(text)
        .context("Amount must be a number")?
        .value();
    if value.normalize().scale() > MAX_DECIMAL_PLACES {
        bail!(
            "Amount '{}' has more than {MAX_DECIMAL_PLACES} decimal places",
            text.trim()
        );
    }
    let max = Decimal::from(MAX_AMOUNT);
    if value.abs() > max {
        bail!("Amount '{}' is larger than {}", text.trim(), Amount::new(max));
    }
    Ok(value)
}

/// Parses a required, strictly positive amount such as an income or expense amount.
pub(crate) fn parse_positive(field: &str, text: &str) -> Res<Decimal> {
    let value = parse_amount(text).with_context(|| format!("Invalid {field}"))?;
    if value <= Decimal::ZERO {
        bail!("The {field} must be greater than zero, got '{}'", text.trim());
    }
    Ok(value)
}

/// Parses an amount that may be zero but not negative, such as the saved amount of a goal.
pub(crate) fn parse_non_negative(field: &str, text: &str) -> Res<Decimal> {
    let value = parse_amount(text).with_context(|| format!("Invalid {field}"))?;
    if value < Decimal::ZERO {
        bail!("The {field} cannot be negative, got '{}'", text.trim());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_plain() {
        let amount = Amount::from_str("50.00").unwrap();
        assert_eq!(amount.value(), dec("50.00"));
    }

    #[test]
    fn test_parse_with_rupee_sign() {
        let amount = Amount::from_str("₹50.25").unwrap();
        assert_eq!(amount.value(), dec("50.25"));
    }

    #[test]
    fn test_parse_with_dollar_sign_and_commas() {
        let amount = Amount::from_str("$1,234,567.89").unwrap();
        assert_eq!(amount.value(), dec("1234567.89"));
    }

    #[test]
    fn test_parse_negative() {
        let amount = Amount::from_str("-₹60,000.00").unwrap();
        assert_eq!(amount.value(), dec("-60000.00"));
        assert!(amount.is_negative());
    }

    #[test]
    fn test_parse_whitespace() {
        let amount = Amount::from_str("  ₹ 50.00  ").unwrap();
        assert_eq!(amount.value(), dec("50.00"));
    }

    #[test]
    fn test_parse_empty_is_error() {
        assert!(Amount::from_str("").is_err());
        assert!(Amount::from_str("   ").is_err());
    }

    #[test]
    fn test_parse_garbage_is_error() {
        let err = Amount::from_str("twelve").unwrap_err();
        assert!(err.to_string().contains("twelve"));
    }

    #[test]
    fn test_lenient_treats_garbage_as_zero() {
        assert_eq!(Amount::lenient("abc"), Decimal::ZERO);
        assert_eq!(Amount::lenient(""), Decimal::ZERO);
        assert_eq!(Amount::lenient("12.5"), dec("12.5"));
    }

    #[test]
    fn test_display_default_format() {
        let amount = Amount::new(dec("1200.5"));
        assert_eq!(amount.to_string(), "₹1,200.50");
    }

    #[test]
    fn test_display_plain() {
        assert_eq!(Amount::plain(dec("0.01")).to_string(), "0.01");
        assert_eq!(Amount::plain(dec("-100")).to_string(), "-100.00");
    }

    #[test]
    fn test_display_zero() {
        assert_eq!(Amount::new(Decimal::ZERO).to_string(), "₹0.00");
    }

    #[test]
    fn test_zero_is_not_positive_or_negative() {
        let zero = Amount::new(Decimal::ZERO);
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());
        assert!(zero.is_zero());
    }

    #[test]
    fn test_serde_uses_display_text() {
        let amount = Amount::new(dec("50"));
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"₹50.00\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value(), dec("50"));
    }

    #[test]
    fn test_parse_positive_rejects_zero_and_negative() {
        assert!(parse_positive("amount", "0").is_err());
        assert!(parse_positive("amount", "-5").is_err());
        assert!(parse_positive("amount", "").is_err());
        assert_eq!(parse_positive("amount", "301").unwrap(), dec("301"));
    }

    #[test]
    fn test_parse_non_negative_allows_zero() {
        assert_eq!(parse_non_negative("current amount", "0").unwrap(), Decimal::ZERO);
        assert!(parse_non_negative("current amount", "-0.01").is_err());
    }

    #[test]
    fn test_parse_amount_rejects_sub_paise_precision() {
        assert!(parse_amount("0.0000000000000000000000000001").is_err());
        assert!(parse_amount("10.001").is_err());
        assert_eq!(parse_amount("10.010").unwrap(), dec("10.01"));
    }

    #[test]
    fn test_parse_amount_rejects_huge_values() {
        assert!(parse_amount("79228162514264337593543950335").is_err());
        assert!(parse_amount("-1,000,000,000,000.01").is_err());
        assert_eq!(
            parse_amount("₹1,000,000,000,000").unwrap(),
            Decimal::from(MAX_AMOUNT)
        );
    }
}
