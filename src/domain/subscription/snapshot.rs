//! Wire representation for persisting subscriptions.
//!
//! A subscription round-trips through a flat JSON structure: phases are
//! stored as an array of records carrying their own sequence numbers,
//! and hydration re-links them by position instead of embedding object
//! cycles in the JSON. Repository implementations work exclusively with
//! these snapshot types.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::billing::{Interval, Phase};
use crate::domain::foundation::{
    DomainError, GatewayConfigId, Money, SubscriptionId, SubscriptionKey, Timestamp,
};
use crate::domain::payment::{Address, Customer, PaymentLines};

use super::{Subscription, SubscriptionStatus};

/// Stored form of a single phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSnapshot {
    pub sequence_number: u32,
    pub start_date: Timestamp,
    pub end_date: Option<Timestamp>,
    pub interval: Interval,
    pub amount: Money,
    pub is_trial: bool,
    pub is_prorated: bool,
    pub alignment_rate: Option<f64>,
    pub canceled_at: Option<Timestamp>,
}

impl PhaseSnapshot {
    /// Rebuilds the domain phase this snapshot was captured from.
    ///
    /// # Errors
    ///
    /// Returns a validation error for stored records with a zero
    /// sequence number.
    pub fn restore(&self) -> Result<Phase, DomainError> {
        Phase::reconstitute(
            self.sequence_number,
            self.start_date,
            self.end_date,
            self.interval,
            self.amount.clone(),
            self.is_trial,
            self.is_prorated,
            self.alignment_rate,
            self.canceled_at,
        )
    }
}

impl From<&Phase> for PhaseSnapshot {
    fn from(phase: &Phase) -> Self {
        Self {
            sequence_number: phase.sequence_number(),
            start_date: phase.start_date(),
            end_date: phase.end_date(),
            interval: phase.interval(),
            amount: phase.amount().clone(),
            is_trial: phase.is_trial(),
            is_prorated: phase.is_prorated(),
            alignment_rate: phase.alignment_rate(),
            canceled_at: phase.canceled_at(),
        }
    }
}

/// Stored form of a subscription aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub id: SubscriptionId,
    pub key: SubscriptionKey,
    pub status: SubscriptionStatus,
    pub activated_at: Option<Timestamp>,
    pub next_payment_date: Option<Timestamp>,
    pub phases: Vec<PhaseSnapshot>,
    pub payment_method: Option<String>,
    pub description: Option<String>,
    pub config_id: Option<GatewayConfigId>,
    pub customer: Option<Customer>,
    pub billing_address: Option<Address>,
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub lines: PaymentLines,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Captures the stored form of this subscription.
    pub fn to_snapshot(&self) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            id: self.id(),
            key: self.key().clone(),
            status: self.status(),
            activated_at: self.activated_at(),
            next_payment_date: self.next_payment_date(),
            phases: self.phases().iter().map(PhaseSnapshot::from).collect(),
            payment_method: self.payment_method().map(str::to_owned),
            description: self.description().map(str::to_owned),
            config_id: self.config_id(),
            customer: self.customer().cloned(),
            billing_address: self.billing_address().cloned(),
            shipping_address: self.shipping_address().cloned(),
            lines: self.lines().clone(),
            created_at: self.created_at(),
            updated_at: self.updated_at(),
        }
    }

    /// Rebuilds a subscription from its stored form.
    ///
    /// # Errors
    ///
    /// Returns `PhaseNotFound` when phase sequence numbers are not
    /// contiguous from 1, which indicates corrupted or partially
    /// migrated data. Surfacing this beats silently billing the wrong
    /// phase.
    pub fn from_snapshot(snapshot: SubscriptionSnapshot) -> Result<Self, DomainError> {
        let phases = snapshot
            .phases
            .iter()
            .map(PhaseSnapshot::restore)
            .collect::<Result<Vec<_>, _>>()?;

        let subscription = Subscription::reconstitute(
            snapshot.id,
            snapshot.key,
            snapshot.status,
            phases,
            snapshot.next_payment_date,
            snapshot.payment_method,
            snapshot.description,
            snapshot.config_id,
            snapshot.customer,
            snapshot.billing_address,
            snapshot.shipping_address,
            snapshot.lines,
            snapshot.activated_at,
            snapshot.created_at,
            snapshot.updated_at,
        )?;

        debug!(
            subscription_id = %subscription.id(),
            phases = subscription.phases().len(),
            "Hydrated subscription from snapshot"
        );

        Ok(subscription)
    }
}
