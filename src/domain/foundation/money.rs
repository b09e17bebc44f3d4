//! Money value objects: currency codes and minor-unit amounts.
//!
//! Amounts are integer minor units (cents for two-decimal currencies).
//! Floating point never touches stored amounts; only proration applies a
//! rate and rounds straight back to minor units.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// ISO 4217 style currency code (three ASCII letters, stored uppercase).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Creates a Currency, returning error for anything but three letters.
    pub fn new(code: impl Into<String>) -> Result<Self, ValidationError> {
        let code = code.into();
        if code.is_empty() {
            return Err(ValidationError::empty_field("currency"));
        }
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                "expected a three-letter code",
            ));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// Euro, the default currency of the payment plugin.
    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    /// United States dollar.
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monetary amount in minor units of a currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// Creates a Money value from minor units.
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: 0,
            currency,
        }
    }

    /// Returns the amount in minor units.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Returns the currency.
    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Checks whether the amount is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Adds another amount of the same currency.
    pub fn add(&self, other: &Money) -> Result<Money, ValidationError> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| ValidationError::invalid_format("amount", "overflow during add"))?;
        Ok(Money::new(amount, self.currency.clone()))
    }

    /// Subtracts another amount of the same currency.
    pub fn subtract(&self, other: &Money) -> Result<Money, ValidationError> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or_else(|| ValidationError::invalid_format("amount", "overflow during subtract"))?;
        Ok(Money::new(amount, self.currency.clone()))
    }

    /// Multiplies the amount by an integer factor.
    pub fn multiply(&self, factor: i64) -> Result<Money, ValidationError> {
        let amount = self
            .amount
            .checked_mul(factor)
            .ok_or_else(|| ValidationError::invalid_format("amount", "overflow during multiply"))?;
        Ok(Money::new(amount, self.currency.clone()))
    }

    /// Applies a proration rate, rounding half away from zero on minor units.
    pub fn prorate(&self, rate: f64) -> Money {
        let prorated = (self.amount as f64 * rate).round() as i64;
        Money::new(prorated, self.currency.clone())
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), ValidationError> {
        if self.currency != other.currency {
            return Err(ValidationError::invalid_format(
                "currency",
                format!(
                    "cannot combine {} with {}",
                    self.currency, other.currency
                ),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        write!(f, "{}{}.{:02} {}", sign, abs / 100, abs % 100, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_accepts_three_letter_code() {
        let currency = Currency::new("eur").unwrap();
        assert_eq!(currency.as_str(), "EUR");
    }

    #[test]
    fn currency_rejects_empty_string() {
        let result = Currency::new("");
        assert!(matches!(result, Err(ValidationError::EmptyField { .. })));
    }

    #[test]
    fn currency_rejects_wrong_length() {
        assert!(Currency::new("EU").is_err());
        assert!(Currency::new("EURO").is_err());
    }

    #[test]
    fn currency_rejects_non_alphabetic() {
        assert!(Currency::new("E1R").is_err());
    }

    #[test]
    fn currency_deserializes_with_validation() {
        let currency: Currency = serde_json::from_str("\"usd\"").unwrap();
        assert_eq!(currency, Currency::usd());

        let result: Result<Currency, _> = serde_json::from_str("\"not-a-code\"");
        assert!(result.is_err());
    }

    #[test]
    fn money_add_combines_same_currency() {
        let a = Money::new(1000, Currency::eur());
        let b = Money::new(250, Currency::eur());
        assert_eq!(a.add(&b).unwrap().amount(), 1250);
    }

    #[test]
    fn money_add_rejects_currency_mismatch() {
        let a = Money::new(1000, Currency::eur());
        let b = Money::new(250, Currency::usd());
        assert!(a.add(&b).is_err());
    }

    #[test]
    fn money_subtract_can_go_negative() {
        let a = Money::new(100, Currency::eur());
        let b = Money::new(250, Currency::eur());
        assert_eq!(a.subtract(&b).unwrap().amount(), -150);
    }

    #[test]
    fn money_multiply_scales_amount() {
        let price = Money::new(499, Currency::eur());
        assert_eq!(price.multiply(3).unwrap().amount(), 1497);
    }

    #[test]
    fn money_add_rejects_overflow() {
        let a = Money::new(i64::MAX, Currency::eur());
        let b = Money::new(1, Currency::eur());
        assert!(matches!(
            a.add(&b),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn money_subtract_rejects_overflow() {
        let a = Money::new(i64::MIN, Currency::eur());
        let b = Money::new(1, Currency::eur());
        assert!(matches!(
            a.subtract(&b),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn money_multiply_rejects_overflow() {
        let price = Money::new(i64::MAX / 2 + 1, Currency::eur());
        assert!(price.multiply(2).is_err());
    }

    #[test]
    fn money_prorate_rounds_half_away_from_zero() {
        let price = Money::new(333, Currency::eur());
        assert_eq!(price.prorate(0.5).amount(), 167);

        let negative = Money::new(-333, Currency::eur());
        assert_eq!(negative.prorate(0.5).amount(), -167);
    }

    #[test]
    fn money_prorate_full_rate_is_identity() {
        let price = Money::new(2999, Currency::eur());
        assert_eq!(price.prorate(1.0), price);
    }

    #[test]
    fn money_displays_with_decimal_point() {
        assert_eq!(format!("{}", Money::new(1250, Currency::eur())), "12.50 EUR");
        assert_eq!(format!("{}", Money::new(-50, Currency::usd())), "-0.50 USD");
        assert_eq!(format!("{}", Money::new(5, Currency::eur())), "0.05 EUR");
    }

    #[test]
    fn money_serializes_amount_and_currency() {
        let price = Money::new(999, Currency::eur());
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(json, "{\"amount\":999,\"currency\":\"EUR\"}");

        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, price);
    }
}
