//! Payment entity handed off to the gateway layer.
//!
//! A payment is assembled by the subscription aggregate and carried to a
//! gateway adapter unchanged. The engine never talks to a gateway itself;
//! it only prepares this value and reads back statuses.

use serde::{Deserialize, Serialize};

use crate::domain::billing::Period;
use crate::domain::foundation::{
    DomainError, ErrorCode, GatewayConfigId, Money, PaymentId, StateMachine, SubscriptionId,
    Timestamp,
};

use super::{Address, Customer, PaymentLines, PaymentStatus};

/// One charge attempt, with everything a gateway needs to process it.
///
/// # Invariants
///
/// - Status changes follow the [`PaymentStatus`] state machine
/// - `period` is set for subscription renewals, absent for one-off charges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier for this payment.
    pub id: PaymentId,

    /// Owning subscription, when this charges a renewal period.
    pub subscription_id: Option<SubscriptionId>,

    /// The billed period, when this charges a renewal period.
    pub period: Option<Period>,

    /// Gateway payment method token (for example "ideal" or "card").
    pub payment_method: Option<String>,

    /// Statement description shown to the customer.
    pub description: Option<String>,

    /// Gateway configuration to charge through.
    pub config_id: Option<GatewayConfigId>,

    /// Customer contact details.
    pub customer: Option<Customer>,

    /// Billing address.
    pub billing_address: Option<Address>,

    /// Shipping address.
    pub shipping_address: Option<Address>,

    /// Invoice line items.
    pub lines: PaymentLines,

    /// Amount due. For renewals this is the phase's effective amount at
    /// charge time.
    pub total_amount: Option<Money>,

    /// Current gateway status.
    pub status: PaymentStatus,

    /// When the payment was created.
    pub created_at: Timestamp,
}

impl Payment {
    /// Creates an empty open payment.
    pub fn new() -> Self {
        Self {
            id: PaymentId::new(),
            subscription_id: None,
            period: None,
            payment_method: None,
            description: None,
            config_id: None,
            customer: None,
            billing_address: None,
            shipping_address: None,
            lines: PaymentLines::new(),
            total_amount: None,
            status: PaymentStatus::Open,
            created_at: Timestamp::now(),
        }
    }

    /// Checks whether this payment charges the given subscription.
    pub fn belongs_to(&self, subscription_id: SubscriptionId) -> bool {
        self.subscription_id == Some(subscription_id)
    }

    /// Attaches the billed period.
    pub fn attach_period(&mut self, period: Period) {
        self.period = Some(period);
    }

    /// Sets the amount due.
    pub fn set_total_amount(&mut self, amount: Money) {
        self.total_amount = Some(amount);
    }

    /// Applies a status reported by the gateway.
    ///
    /// Repeating the current status is a no-op: gateways redeliver
    /// webhooks.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` when the gateway reports a status
    /// the lifecycle cannot reach from the current one.
    pub fn set_status(&mut self, status: PaymentStatus) -> Result<(), DomainError> {
        if self.status == status {
            return Ok(());
        }
        self.status = self.status.transition_to(status).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition payment from {:?} to {:?}",
                    self.status, status
                ),
            )
        })?;
        Ok(())
    }
}

impl Default for Payment {
    fn default() -> Self {
        Self::new()
    }
}
