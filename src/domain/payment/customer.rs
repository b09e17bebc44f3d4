//! Customer contact payloads for the gateway hand-off.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CustomerId, ValidationError};

/// Minimal customer details a gateway needs to create a charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl Customer {
    /// Creates a customer, validating name and email.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        let email = email.into();
        if name.is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if email.is_empty() {
            return Err(ValidationError::empty_field("email"));
        }
        if !email.contains('@') {
            return Err(ValidationError::invalid_format("email", "missing @ symbol"));
        }
        Ok(Self {
            id: CustomerId::new(),
            name,
            email,
            phone: None,
        })
    }

    /// Sets the phone number.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// Postal address attached to a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line_1: String,
    pub line_2: Option<String>,
    pub city: String,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: String,
    pub region: Option<String>,
}

impl Address {
    /// Creates an address, validating the required fields.
    pub fn new(
        line_1: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let line_1 = line_1.into();
        let city = city.into();
        let postal_code = postal_code.into();
        let country_code = country_code.into();

        if line_1.is_empty() {
            return Err(ValidationError::empty_field("line_1"));
        }
        if city.is_empty() {
            return Err(ValidationError::empty_field("city"));
        }
        if postal_code.is_empty() {
            return Err(ValidationError::empty_field("postal_code"));
        }
        if country_code.len() != 2 || !country_code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "country_code",
                "expected a two-letter code",
            ));
        }

        Ok(Self {
            line_1,
            line_2: None,
            city,
            postal_code,
            country_code: country_code.to_ascii_uppercase(),
            region: None,
        })
    }

    /// Sets the second address line.
    pub fn with_line_2(mut self, line_2: impl Into<String>) -> Self {
        self.line_2 = Some(line_2.into());
        self
    }

    /// Sets the region or state.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}
