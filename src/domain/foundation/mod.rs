//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, money, and error types
//! that form the vocabulary of the billing domain.

mod ids;
mod timestamp;
mod money;
mod state_machine;
mod errors;

pub use ids::{CustomerId, GatewayConfigId, PaymentId, SubscriptionId, SubscriptionKey};
pub use timestamp::Timestamp;
pub use money::{Currency, Money};
pub use state_machine::StateMachine;
pub use errors::{DomainError, ErrorCode, ValidationError};
