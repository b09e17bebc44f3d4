//! Payment line items.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, ValidationError};

/// One invoice line: a description, a quantity, and a unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLine {
    description: String,
    quantity: u32,
    unit_price: Money,
}

impl PaymentLine {
    /// Creates a line, requiring a description and a positive quantity.
    pub fn new(
        description: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, ValidationError> {
        let description = description.into();
        if description.is_empty() {
            return Err(ValidationError::empty_field("description"));
        }
        if quantity == 0 {
            return Err(ValidationError::invalid_format(
                "quantity",
                "must be at least 1",
            ));
        }
        Ok(Self {
            description,
            quantity,
            unit_price,
        })
    }

    /// Returns the line description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the quantity.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Returns the unit price.
    pub fn unit_price(&self) -> &Money {
        &self.unit_price
    }

    /// Returns quantity times unit price.
    pub fn total(&self) -> Result<Money, ValidationError> {
        self.unit_price.multiply(i64::from(self.quantity))
    }
}

/// Ordered collection of payment lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentLines(Vec<PaymentLine>);

impl PaymentLines {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a line.
    pub fn push(&mut self, line: PaymentLine) {
        self.0.push(line);
    }

    /// Returns the number of lines.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks whether there are no lines.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the lines.
    pub fn iter(&self) -> std::slice::Iter<'_, PaymentLine> {
        self.0.iter()
    }

    /// Sums the line totals.
    ///
    /// Returns None for an empty collection (no currency to anchor the
    /// sum) and a validation error when lines mix currencies.
    pub fn total(&self) -> Result<Option<Money>, ValidationError> {
        let mut lines = self.0.iter();
        let Some(first) = lines.next() else {
            return Ok(None);
        };
        let mut sum = first.total()?;
        for line in lines {
            sum = sum.add(&line.total()?)?;
        }
        Ok(Some(sum))
    }
}

impl FromIterator<PaymentLine> for PaymentLines {
    fn from_iter<I: IntoIterator<Item = PaymentLine>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Currency;

    fn eur(amount: i64) -> Money {
        Money::new(amount, Currency::eur())
    }

    #[test]
    fn line_requires_description_and_quantity() {
        assert!(PaymentLine::new("", 1, eur(100)).is_err());
        assert!(PaymentLine::new("Widget", 0, eur(100)).is_err());
    }

    #[test]
    fn line_total_multiplies_by_quantity() {
        let line = PaymentLine::new("Widget", 3, eur(250)).unwrap();
        assert_eq!(line.total().unwrap(), eur(750));
    }

    #[test]
    fn line_total_rejects_amount_overflow() {
        let line = PaymentLine::new("Bulk order", 2, eur(i64::MAX / 2 + 1)).unwrap();
        assert!(line.total().is_err());
    }

    #[test]
    fn empty_lines_have_no_total() {
        assert_eq!(PaymentLines::new().total().unwrap(), None);
    }

    #[test]
    fn lines_total_sums_all_lines() {
        let mut lines = PaymentLines::new();
        lines.push(PaymentLine::new("Subscription", 1, eur(999)).unwrap());
        lines.push(PaymentLine::new("Setup fee", 1, eur(500)).unwrap());
        assert_eq!(lines.total().unwrap(), Some(eur(1499)));
    }

    #[test]
    fn lines_total_rejects_mixed_currencies() {
        let mut lines = PaymentLines::new();
        lines.push(PaymentLine::new("Subscription", 1, eur(999)).unwrap());
        lines.push(
            PaymentLine::new("Import duty", 1, Money::new(100, Currency::usd())).unwrap(),
        );
        assert!(lines.total().is_err());
    }
}
