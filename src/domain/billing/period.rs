//! Billing period value object.
//!
//! A period is one chargeable slice of a phase: a half-open date range
//! plus the amount that was current when the period was produced. Periods
//! reference their owning phase by sequence number; they never hold the
//! phase itself.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, Money, Timestamp, ValidationError};
use crate::domain::payment::Payment;
use crate::domain::subscription::Subscription;

/// One chargeable slice of a subscription phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    phase_sequence: u32,
    start_date: Timestamp,
    end_date: Timestamp,
    amount: Money,
    trial: bool,
}

impl Period {
    /// Creates a period, validating that the range does not run backwards.
    pub fn new(
        phase_sequence: u32,
        start_date: Timestamp,
        end_date: Timestamp,
        amount: Money,
        trial: bool,
    ) -> Result<Self, ValidationError> {
        if start_date.is_after(&end_date) {
            return Err(ValidationError::invalid_format(
                "period",
                format!("start {} is after end {}", start_date, end_date),
            ));
        }
        Ok(Self {
            phase_sequence,
            start_date,
            end_date,
            amount,
            trial,
        })
    }

    /// Returns the sequence number of the owning phase.
    pub fn phase_sequence(&self) -> u32 {
        self.phase_sequence
    }

    /// Returns the inclusive start of the period.
    pub fn start_date(&self) -> Timestamp {
        self.start_date
    }

    /// Returns the exclusive end of the period.
    pub fn end_date(&self) -> Timestamp {
        self.end_date
    }

    /// Returns the amount captured when the period was produced.
    pub fn amount(&self) -> &Money {
        &self.amount
    }

    /// Checks whether the owning phase was a trial at production time.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    /// Builds the payment that charges for this period.
    ///
    /// The due amount is the owning phase's *current* effective amount,
    /// not the amount captured in the period: a price change between
    /// period production and charging must bill at the new price.
    ///
    /// # Errors
    ///
    /// Returns `PhaseNotFound` when the subscription no longer has a phase
    /// with this period's sequence number.
    pub fn new_payment(&self, subscription: &Subscription) -> Result<Payment, DomainError> {
        let phase = subscription
            .phase_by_sequence(self.phase_sequence)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::PhaseNotFound,
                    format!("no phase with sequence {}", self.phase_sequence),
                )
                .with_detail("subscription_id", subscription.id().to_string())
            })?;

        let mut payment = subscription.new_payment();
        payment.set_total_amount(phase.effective_amount());
        payment.attach_period(self.clone());
        Ok(payment)
    }
}
