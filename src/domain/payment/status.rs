//! Payment status state machine.
//!
//! Mirrors the lifecycle a gateway reports for a single charge. Only the
//! transitions a gateway can actually produce are valid.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Status of one payment at the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created but not yet settled. The customer may still be in the
    /// checkout flow.
    Open,

    /// Money received.
    Success,

    /// The charge was attempted and did not go through.
    Failure,

    /// Cancelled before settlement, by the customer or the merchant.
    Cancelled,

    /// The checkout window elapsed without settlement.
    Expired,

    /// A successful payment that was paid back.
    Refunded,
}

impl PaymentStatus {
    /// Returns true while the gateway can still change this status.
    pub fn is_pending(&self) -> bool {
        matches!(self, PaymentStatus::Open | PaymentStatus::Success)
    }

    /// Returns true when the period this payment charges needs no further
    /// collection attempt: settled, or still in flight.
    pub fn covers_period(&self) -> bool {
        matches!(self, PaymentStatus::Open | PaymentStatus::Success)
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            // From OPEN
            (Open, Success)
                | (Open, Failure)
                | (Open, Cancelled)
                | (Open, Expired)
            // From SUCCESS
                | (Success, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Open => vec![Success, Failure, Cancelled, Expired],
            Success => vec![Refunded],
            Failure | Cancelled | Expired | Refunded => vec![],
        }
    }
}
