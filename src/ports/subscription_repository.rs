//! Subscription repository port (write side).
//!
//! Defines the contract for persisting and retrieving Subscription
//! aggregates. Implementations handle the actual storage operations,
//! typically through the snapshot types.
//!
//! # Design
//!
//! - **Write-focused**: Optimized for aggregate persistence
//! - **Event publishing**: Implementations should publish domain events
//! - **Serialized cursor advances**: At most one in-flight cursor
//!   advance per subscription ID
//!
//! # Example
//!
//! ```ignore
//! async fn sweep_due_subscriptions(
//!     repo: &dyn SubscriptionRepository,
//!     now: Timestamp,
//! ) -> Result<Vec<Period>, DomainError> {
//!     let mut periods = Vec::new();
//!     for mut subscription in repo.find_due_before(now).await? {
//!         if let Some(period) = subscription.next_period()? {
//!             repo.update(&subscription).await?;
//!             periods.push(period);
//!         }
//!     }
//!     Ok(periods)
//! }
//! ```

use crate::domain::foundation::{DomainError, SubscriptionId, SubscriptionKey, Timestamp};
use crate::domain::subscription::Subscription;
use async_trait::async_trait;

/// Repository port for Subscription aggregate persistence.
///
/// Handles write operations for the billing schedule lifecycle.
/// Implementations must ensure:
/// - Unique subscription key constraint
/// - Domain event publication on state changes
/// - Optimistic locking for concurrent cursor advances
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Save a new subscription.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the key is already taken
    /// - `StorageError` on persistence failure
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Update an existing subscription.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the subscription doesn't exist
    /// - `StorageError` on persistence failure
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Find a subscription by its ID.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &SubscriptionId)
        -> Result<Option<Subscription>, DomainError>;

    /// Find a subscription by its external key.
    ///
    /// Returns `None` if not found. This is the lookup used by
    /// customer-facing URLs and webhook payloads.
    async fn find_by_key(
        &self,
        key: &SubscriptionKey,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Find subscriptions whose next payment date is at or before `date`.
    ///
    /// Used by the renewal sweep to pick up subscriptions that are due.
    /// Exhausted subscriptions have no payment date and never match.
    async fn find_due_before(&self, date: Timestamp) -> Result<Vec<Subscription>, DomainError>;

    /// Delete a subscription (primarily for testing).
    ///
    /// In production, subscriptions transition to a terminal status
    /// rather than being deleted.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the subscription doesn't exist
    /// - `StorageError` on persistence failure
    async fn delete(&self, id: &SubscriptionId) -> Result<(), DomainError>;
}
