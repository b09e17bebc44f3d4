//! Subscription status state machine.
//!
//! Defines all possible subscription states and valid transitions
//! through the billing lifecycle.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Subscription lifecycle status.
///
/// Represents where a subscription stands in the collection
/// lifecycle, from creation through to one of its terminal ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Initial state awaiting first payment confirmation.
    /// Nothing is collected yet.
    Open,

    /// Running subscription. Renewal periods are collected as the
    /// payment date comes due.
    Active,

    /// Collection suspended by the merchant or customer.
    /// The schedule stands still until resumed.
    OnHold,

    /// Stopped before the schedule ran out. No further collection.
    Cancelled,

    /// All phases ran to their natural end. No further collection.
    Completed,

    /// Abandoned after payment attempts kept failing.
    Failure,
}

impl SubscriptionStatus {
    /// Returns true if renewal periods should be collected in this
    /// status.
    ///
    /// Only Active subscriptions bill. Open ones await their first
    /// payment, OnHold ones are suspended, and the terminal states
    /// never collect again.
    pub fn is_billable(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From OPEN
            (Open, Active)
            // From ACTIVE
                | (Active, OnHold)
                | (Active, Cancelled)
                | (Active, Completed)
                | (Active, Failure)
            // From ON_HOLD
                | (OnHold, Active)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Open => vec![Active],
            Active => vec![OnHold, Cancelled, Completed, Failure],
            OnHold => vec![Active],
            Cancelled | Completed | Failure => vec![],
        }
    }
}
