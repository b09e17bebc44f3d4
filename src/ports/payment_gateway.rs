//! Payment gateway port for external payment processing.
//!
//! Defines the contract for charging the payments the engine assembles.
//! Implementations talk to an actual provider (Mollie, Stripe, a test
//! double); the engine itself never leaves this boundary.
//!
//! # Design
//!
//! - **Gateway agnostic**: The [`Payment`] entity carries everything a
//!   provider needs
//! - **Idempotent**: Creating the same payment twice must not double
//!   charge
//! - **Status pull**: Webhook handling lives outside this crate;
//!   implementations expose the resulting status here

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::payment::{Payment, PaymentStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Provider-side identifier of a created payment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayReference(String);

impl GatewayReference {
    /// Wraps a provider payment identifier.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GatewayReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Port for payment gateway integrations.
///
/// Receives assembled payments and reports back their provider status.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment at the provider.
    ///
    /// Returns the provider's reference for later status lookups.
    async fn create_payment(&self, payment: &Payment) -> Result<GatewayReference, GatewayError>;

    /// Fetch the current status of a previously created payment.
    async fn payment_status(
        &self,
        reference: &GatewayReference,
    ) -> Result<PaymentStatus, GatewayError>;

    /// Cancel a payment that has not completed yet.
    ///
    /// Issued when a billing window lapses with its payment still open,
    /// so the stale checkout cannot settle after collection has moved on.
    async fn cancel_payment(&self, reference: &GatewayReference) -> Result<(), GatewayError>;
}

/// Errors from gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl GatewayError {
    /// Create a new gateway error.
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    /// Create a rejection error for a payment the provider refused.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::PaymentRejected, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(
            GatewayErrorCode::NotFound,
            format!("{} not found", resource),
        )
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        let code = match err.code {
            GatewayErrorCode::NotFound => ErrorCode::PaymentNotFound,
            GatewayErrorCode::InvalidRequest => ErrorCode::ValidationFailed,
            _ => ErrorCode::GatewayError,
        };

        DomainError::new(code, err.message)
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Provider refused the payment.
    PaymentRejected,

    /// Payment request malformed or incomplete.
    InvalidRequest,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider API error.
    ProviderError,
}

impl GatewayErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError | GatewayErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::PaymentRejected => "payment_rejected",
            GatewayErrorCode::InvalidRequest => "invalid_request",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            GatewayErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }

    #[test]
    fn gateway_error_retryable() {
        assert!(GatewayErrorCode::NetworkError.is_retryable());
        assert!(GatewayErrorCode::RateLimitExceeded.is_retryable());

        assert!(!GatewayErrorCode::PaymentRejected.is_retryable());
        assert!(!GatewayErrorCode::NotFound.is_retryable());
    }

    #[test]
    fn gateway_error_display() {
        let err = GatewayError::rejected("Card was declined");
        assert!(err.to_string().contains("payment_rejected"));
        assert!(err.to_string().contains("Card was declined"));
    }

    #[test]
    fn gateway_error_converts_to_domain_error() {
        let gateway_err = GatewayError::rejected("Declined");
        let domain_err: DomainError = gateway_err.into();
        assert_eq!(domain_err.code, ErrorCode::GatewayError);
        assert!(domain_err.message.contains("Declined"));
    }

    #[test]
    fn not_found_maps_to_payment_not_found() {
        let gateway_err = GatewayError::not_found("Payment");
        let domain_err: DomainError = gateway_err.into();
        assert_eq!(domain_err.code, ErrorCode::PaymentNotFound);
    }
}
