//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the billing engine and the outside world. Adapters implement these
//! ports in the surrounding plugin.
//!
//! ## Persistence Ports
//!
//! - `SubscriptionRepository` - Subscription aggregate persistence
//!
//! ## Gateway Ports
//!
//! - `PaymentGateway` - Charging payments through a provider

mod payment_gateway;
mod subscription_repository;

pub use payment_gateway::{GatewayError, GatewayErrorCode, GatewayReference, PaymentGateway};
pub use subscription_repository::SubscriptionRepository;
