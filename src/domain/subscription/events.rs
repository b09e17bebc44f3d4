//! Subscription domain events.

use crate::domain::foundation::{SubscriptionId, Timestamp};
use serde::{Deserialize, Serialize};

use super::SubscriptionStatus;

/// Events that can occur during the subscription lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SubscriptionEvent {
    /// A new subscription was created.
    Created {
        subscription_id: SubscriptionId,
        created_at: Timestamp,
    },

    /// A phase was appended to the schedule.
    PhaseAdded {
        subscription_id: SubscriptionId,
        sequence_number: u32,
    },

    /// The status changed.
    StatusChanged {
        subscription_id: SubscriptionId,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    },

    /// A billing period was handed out and the payment date advanced.
    PeriodConsumed {
        subscription_id: SubscriptionId,
        phase_sequence: u32,
        start_date: Timestamp,
        end_date: Timestamp,
    },

    /// A phase was canceled and stopped producing periods.
    PhaseCanceled {
        subscription_id: SubscriptionId,
        sequence_number: u32,
        canceled_at: Timestamp,
    },

    /// A phase was split by a mid-cycle alignment.
    PhaseAligned {
        subscription_id: SubscriptionId,
        sequence_number: u32,
        align_date: Timestamp,
        alignment_rate: f64,
    },

    /// The next payment date was moved.
    NextPaymentDateChanged {
        subscription_id: SubscriptionId,
        next_payment_date: Option<Timestamp>,
    },
}
