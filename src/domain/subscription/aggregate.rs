//! Subscription aggregate - The root entity for recurring billing.
//!
//! A Subscription owns an ordered list of phases and the shared
//! next-payment-date cursor that marks how far collection has
//! progressed. All period consumption and phase bookkeeping flows
//! through this aggregate.

use tracing::debug;

use crate::domain::billing::{Period, Phase};
use crate::domain::foundation::{
    DomainError, ErrorCode, GatewayConfigId, StateMachine, SubscriptionId, SubscriptionKey,
    Timestamp,
};
use crate::domain::payment::{Address, Customer, Payment, PaymentLines, PaymentStatus};

use super::{SubscriptionEvent, SubscriptionStatus};

/// The Subscription aggregate root.
///
/// Phases describe what to bill and how often; the cursor records the
/// start of the next period to collect. The cursor is the only
/// progress state in the model: phases derive their created/remaining
/// counts from it and never track progress of their own.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: SubscriptionId,
    key: SubscriptionKey,
    status: SubscriptionStatus,
    phases: Vec<Phase>,
    /// Start of the next period to collect. `None` when the schedule
    /// is exhausted or the subscription has no phases yet.
    next_payment_date: Option<Timestamp>,
    payment_method: Option<String>,
    description: Option<String>,
    config_id: Option<GatewayConfigId>,
    customer: Option<Customer>,
    billing_address: Option<Address>,
    shipping_address: Option<Address>,
    lines: PaymentLines,
    activated_at: Option<Timestamp>,
    created_at: Timestamp,
    updated_at: Timestamp,
    domain_events: Vec<SubscriptionEvent>,
}

impl Subscription {
    /// Creates a new subscription with no phases yet.
    pub fn new(key: SubscriptionKey) -> Self {
        let id = SubscriptionId::new();
        let now = Timestamp::now();

        let mut subscription = Self {
            id,
            key,
            status: SubscriptionStatus::Open,
            phases: Vec::new(),
            next_payment_date: None,
            payment_method: None,
            description: None,
            config_id: None,
            customer: None,
            billing_address: None,
            shipping_address: None,
            lines: PaymentLines::new(),
            activated_at: None,
            created_at: now,
            updated_at: now,
            domain_events: Vec::new(),
        };

        subscription.record_event(SubscriptionEvent::Created {
            subscription_id: id,
            created_at: now,
        });

        subscription
    }

    /// Reconstitutes a subscription from persisted data.
    ///
    /// This is used by repository implementations to reconstruct domain
    /// objects from stored records. It bypasses domain event recording.
    ///
    /// # Errors
    ///
    /// Returns `PhaseNotFound` when the phase list does not carry
    /// contiguous sequence numbers starting at 1, which indicates
    /// corrupted or partially migrated data.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: SubscriptionId,
        key: SubscriptionKey,
        status: SubscriptionStatus,
        phases: Vec<Phase>,
        next_payment_date: Option<Timestamp>,
        payment_method: Option<String>,
        description: Option<String>,
        config_id: Option<GatewayConfigId>,
        customer: Option<Customer>,
        billing_address: Option<Address>,
        shipping_address: Option<Address>,
        lines: PaymentLines,
        activated_at: Option<Timestamp>,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Result<Self, DomainError> {
        for (index, phase) in phases.iter().enumerate() {
            let expected = index as u32 + 1;
            if phase.sequence_number() != expected {
                return Err(DomainError::new(
                    ErrorCode::PhaseNotFound,
                    format!(
                        "Phase sequence numbers must be contiguous: expected {} at position {}, found {}",
                        expected,
                        index,
                        phase.sequence_number()
                    ),
                )
                .with_detail("subscription_id", id.to_string()));
            }
        }

        Ok(Self {
            id,
            key,
            status,
            phases,
            next_payment_date,
            payment_method,
            description,
            config_id,
            customer,
            billing_address,
            shipping_address,
            lines,
            activated_at,
            created_at,
            updated_at,
            domain_events: Vec::new(),
        })
    }

    // ───────────────────────────────────────────────────────────────
    // Builders
    // ───────────────────────────────────────────────────────────────

    /// Sets the gateway payment method token.
    pub fn with_payment_method(mut self, payment_method: impl Into<String>) -> Self {
        self.payment_method = Some(payment_method.into());
        self
    }

    /// Sets the statement description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the gateway configuration to charge through.
    pub fn with_config(mut self, config_id: GatewayConfigId) -> Self {
        self.config_id = Some(config_id);
        self
    }

    /// Sets the customer details carried onto payments.
    pub fn with_customer(mut self, customer: Customer) -> Self {
        self.customer = Some(customer);
        self
    }

    /// Sets the billing address carried onto payments.
    pub fn with_billing_address(mut self, address: Address) -> Self {
        self.billing_address = Some(address);
        self
    }

    /// Sets the shipping address carried onto payments.
    pub fn with_shipping_address(mut self, address: Address) -> Self {
        self.shipping_address = Some(address);
        self
    }

    /// Sets the invoice lines carried onto payments.
    pub fn with_lines(mut self, lines: PaymentLines) -> Self {
        self.lines = lines;
        self
    }

    // ───────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────

    /// Returns the subscription ID.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the external subscription key.
    pub fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    /// Returns the subscription status.
    pub fn status(&self) -> SubscriptionStatus {
        self.status
    }

    /// Returns the phases in sequence order.
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Returns the phase with the given sequence number.
    pub fn phase_by_sequence(&self, sequence_number: u32) -> Option<&Phase> {
        self.phases
            .iter()
            .find(|phase| phase.sequence_number() == sequence_number)
    }

    /// Returns a mutable reference to the phase with the given sequence
    /// number, for price and end date edits.
    pub fn phase_by_sequence_mut(&mut self, sequence_number: u32) -> Option<&mut Phase> {
        self.phases
            .iter_mut()
            .find(|phase| phase.sequence_number() == sequence_number)
    }

    /// Returns the start of the next period to collect.
    pub fn next_payment_date(&self) -> Option<Timestamp> {
        self.next_payment_date
    }

    /// Returns the gateway payment method token.
    pub fn payment_method(&self) -> Option<&str> {
        self.payment_method.as_deref()
    }

    /// Returns the statement description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the gateway configuration reference.
    pub fn config_id(&self) -> Option<GatewayConfigId> {
        self.config_id
    }

    /// Returns the customer details.
    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    /// Returns the billing address.
    pub fn billing_address(&self) -> Option<&Address> {
        self.billing_address.as_ref()
    }

    /// Returns the shipping address.
    pub fn shipping_address(&self) -> Option<&Address> {
        self.shipping_address.as_ref()
    }

    /// Returns the invoice lines.
    pub fn lines(&self) -> &PaymentLines {
        &self.lines
    }

    /// Returns when the subscription last became active.
    pub fn activated_at(&self) -> Option<Timestamp> {
        self.activated_at
    }

    /// Returns when this subscription was created.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Returns when this subscription was last updated.
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Takes accumulated domain events, clearing the internal buffer.
    pub fn take_events(&mut self) -> Vec<SubscriptionEvent> {
        std::mem::take(&mut self.domain_events)
    }

    // ───────────────────────────────────────────────────────────────
    // Schedule Composition
    // ───────────────────────────────────────────────────────────────

    /// Appends a phase to the schedule and returns its sequence number.
    ///
    /// The first phase also initializes the cursor to its start date, so
    /// a freshly composed subscription bills from the schedule start.
    pub fn add_phase(&mut self, mut phase: Phase) -> u32 {
        let sequence_number = self.phases.len() as u32 + 1;
        phase.set_sequence_number(sequence_number);

        if self.next_payment_date.is_none() {
            self.next_payment_date = Some(phase.start_date());
        }

        self.phases.push(phase);
        self.updated_at = Timestamp::now();

        self.record_event(SubscriptionEvent::PhaseAdded {
            subscription_id: self.id,
            sequence_number,
        });

        sequence_number
    }

    /// Cancels the phase with the given sequence number.
    ///
    /// A canceled phase stops producing periods but keeps its place in
    /// the schedule. Canceling twice keeps the earlier timestamp.
    pub fn cancel_phase(
        &mut self,
        sequence_number: u32,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        let subscription_id = self.id;
        let phase = self
            .phases
            .iter_mut()
            .find(|phase| phase.sequence_number() == sequence_number)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::PhaseNotFound,
                    format!("No phase with sequence number {}", sequence_number),
                )
                .with_detail("subscription_id", subscription_id.to_string())
            })?;

        phase.cancel(at);
        let canceled_at = phase.canceled_at().unwrap_or(at);
        self.updated_at = Timestamp::now();

        self.record_event(SubscriptionEvent::PhaseCanceled {
            subscription_id,
            sequence_number,
            canceled_at,
        });

        Ok(())
    }

    /// Splits the phase with the given sequence number at `align_date`.
    ///
    /// A short alignment phase covering `[start, align_date)` is inserted
    /// before the original, the original starts at `align_date` with its
    /// end shifted by the same day count, and all phases are renumbered.
    /// When `prorate` is set the alignment phase charges its rate share
    /// of the regular amount; otherwise it charges the full amount.
    ///
    /// An `align_date` at or before the phase start leaves the schedule
    /// untouched: there is nothing to split off.
    ///
    /// # Errors
    ///
    /// Returns `PhaseNotFound` when no phase carries the sequence number
    /// and `AlignmentFailed` when the split dates cannot be measured.
    pub fn align_phase(
        &mut self,
        sequence_number: u32,
        align_date: Timestamp,
        prorate: bool,
    ) -> Result<(), DomainError> {
        let index = self
            .phases
            .iter()
            .position(|phase| phase.sequence_number() == sequence_number)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::PhaseNotFound,
                    format!("No phase with sequence number {}", sequence_number),
                )
                .with_detail("subscription_id", self.id.to_string())
            })?;

        if !align_date.is_after(&self.phases[index].start_date()) {
            return Ok(());
        }

        let (mut alignment_phase, shifted) = Phase::align(&self.phases[index], align_date)?;
        alignment_phase.set_prorated(prorate);
        let alignment_rate = alignment_phase.alignment_rate().unwrap_or(1.0);

        self.phases[index] = shifted;
        self.phases.insert(index, alignment_phase);
        for (position, phase) in self.phases.iter_mut().enumerate() {
            phase.set_sequence_number(position as u32 + 1);
        }
        self.updated_at = Timestamp::now();

        self.record_event(SubscriptionEvent::PhaseAligned {
            subscription_id: self.id,
            sequence_number: index as u32 + 1,
            align_date,
            alignment_rate,
        });

        Ok(())
    }

    // ───────────────────────────────────────────────────────────────
    // Phase Selection
    // ───────────────────────────────────────────────────────────────

    /// Returns the phase the cursor currently sits in.
    ///
    /// A subscription without a cursor has no current phase: it is
    /// either fully collected or has nothing scheduled.
    pub fn current_phase(&self) -> Option<&Phase> {
        let cursor = self.next_payment_date?;
        self.phase_for_date(cursor)
    }

    /// Returns the first phase, by sequence, that is not completed as of
    /// `date` and not canceled.
    pub fn phase_for_date(&self, date: Timestamp) -> Option<&Phase> {
        self.phases
            .iter()
            .find(|phase| !phase.is_completed_to_date(Some(date)) && !phase.is_canceled())
    }

    /// Returns the phase whose price and interval a human-facing summary
    /// should show.
    ///
    /// Prefers the first uncompleted regular phase, then any regular
    /// phase, then the first phase of any kind. Trial phases and
    /// alignment stubs never represent the subscription's headline
    /// price, so they only show when nothing else exists.
    pub fn display_phase(&self) -> Option<&Phase> {
        self.phases
            .iter()
            .find(|phase| {
                !phase.all_periods_created(self.next_payment_date)
                    && !phase.is_trial()
                    && !phase.is_prorated()
            })
            .or_else(|| {
                self.phases
                    .iter()
                    .find(|phase| !phase.is_trial() && !phase.is_prorated())
            })
            .or_else(|| self.phases.first())
    }

    // ───────────────────────────────────────────────────────────────
    // Period Consumption
    // ───────────────────────────────────────────────────────────────

    /// Hands out the next billing period and advances the cursor to its
    /// end date.
    ///
    /// This is the single authoritative way periods are consumed.
    /// Returns `Ok(None)` when nothing is left to bill: no current
    /// phase, a canceled phase, or an exhausted schedule.
    pub fn next_period(&mut self) -> Result<Option<Period>, DomainError> {
        let cursor = self.next_payment_date;
        let period = match self.current_phase() {
            Some(phase) => phase.next_period(cursor)?,
            None => None,
        };

        let Some(period) = period else {
            return Ok(None);
        };

        self.next_payment_date = self.clamp_payment_date(Some(period.end_date()));
        self.updated_at = Timestamp::now();

        self.record_event(SubscriptionEvent::PeriodConsumed {
            subscription_id: self.id,
            phase_sequence: period.phase_sequence(),
            start_date: period.start_date(),
            end_date: period.end_date(),
        });

        debug!(
            subscription_id = %self.id,
            phase_sequence = period.phase_sequence(),
            period_end = %period.end_date(),
            "Consumed billing period"
        );

        Ok(Some(period))
    }

    /// Like [`next_period`](Self::next_period), but failing when there is
    /// nothing left to bill.
    ///
    /// # Errors
    ///
    /// Returns `NoCurrentPhase` when the schedule is exhausted or empty.
    pub fn new_period(&mut self) -> Result<Period, DomainError> {
        self.next_period()?.ok_or_else(|| {
            DomainError::new(
                ErrorCode::NoCurrentPhase,
                "Subscription has no current phase with periods remaining",
            )
            .with_detail("subscription_id", self.id.to_string())
        })
    }

    /// Decides what should be billed next, accounting for retries.
    ///
    /// Starts from the nominal forward-looking period of the current
    /// phase, then inspects the most recent period that already had
    /// payments:
    ///
    /// - a period with an open or successful payment needs no further
    ///   collection, so the nominal next period stands
    /// - only a Failure as the last attempt makes the period
    ///   retry-eligible; a cancelled, expired or refunded last attempt
    ///   does not
    /// - a retry-eligible period is re-offered instead of the nominal
    ///   one while its end date is still in the future, so a failed
    ///   charge is retried against its original billing window rather
    ///   than silently skipping ahead
    ///
    /// Pure decision procedure: the cursor does not move.
    pub fn renewal_period(
        &self,
        payments: &[Payment],
        now: Timestamp,
    ) -> Result<Option<Period>, DomainError> {
        let nominal = match self.current_phase() {
            Some(phase) => phase.next_period(self.next_payment_date)?,
            None => None,
        };

        let attempts: Vec<&Payment> = payments
            .iter()
            .filter(|payment| payment.belongs_to(self.id))
            .collect();

        let last_period = attempts
            .iter()
            .filter_map(|payment| payment.period.as_ref())
            .max_by_key(|period| (period.start_date(), period.phase_sequence()));
        let Some(last_period) = last_period.cloned() else {
            return Ok(nominal);
        };

        let group: Vec<&Payment> = attempts
            .iter()
            .copied()
            .filter(|payment| {
                payment.period.as_ref().map_or(false, |period| {
                    period.start_date() == last_period.start_date()
                        && period.phase_sequence() == last_period.phase_sequence()
                })
            })
            .collect();

        if group.iter().any(|payment| payment.status.covers_period()) {
            return Ok(nominal);
        }

        let Some(last_attempt) = group.iter().max_by_key(|payment| payment.created_at) else {
            return Ok(nominal);
        };
        if last_attempt.status != PaymentStatus::Failure {
            return Ok(nominal);
        }

        if last_period.end_date().is_after(&now) {
            return Ok(Some(last_period));
        }

        Ok(nominal)
    }

    // ───────────────────────────────────────────────────────────────
    // Cursor Management
    // ───────────────────────────────────────────────────────────────

    /// Moves the cursor, clamping to `None` at or past the subscription
    /// end date.
    ///
    /// The clamp enforces the invariant that a fully collected
    /// subscription never has a pending payment date.
    pub fn set_next_payment_date(&mut self, date: Option<Timestamp>) {
        let clamped = self.clamp_payment_date(date);
        if clamped == self.next_payment_date {
            return;
        }

        self.next_payment_date = clamped;
        self.updated_at = Timestamp::now();

        self.record_event(SubscriptionEvent::NextPaymentDateChanged {
            subscription_id: self.id,
            next_payment_date: clamped,
        });
    }

    /// Returns the end date of the whole schedule.
    ///
    /// `None` when there are no phases or any phase is infinite.
    pub fn end_date(&self) -> Option<Timestamp> {
        if self.phases.iter().any(|phase| phase.is_infinite()) {
            return None;
        }
        self.phases.last().and_then(|phase| phase.end_date())
    }

    /// Returns true if any phase runs forever.
    pub fn is_infinite(&self) -> bool {
        self.phases.iter().any(|phase| phase.is_infinite())
    }

    /// Returns true when every phase has produced all of its periods.
    pub fn all_periods_created(&self) -> bool {
        self.phases
            .iter()
            .all(|phase| phase.all_periods_created(self.next_payment_date))
    }

    fn clamp_payment_date(&self, date: Option<Timestamp>) -> Option<Timestamp> {
        let date = date?;
        match self.end_date() {
            Some(end_date) if !date.is_before(&end_date) => None,
            _ => Some(date),
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Status Transitions
    // ───────────────────────────────────────────────────────────────

    /// Applies a status decided by the surrounding payment policy.
    ///
    /// Entering Active always stamps `activated_at`, also on a resume
    /// from OnHold. Repeating the current status is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` when the lifecycle cannot reach
    /// the target status from the current one.
    pub fn set_status(&mut self, status: SubscriptionStatus) -> Result<(), DomainError> {
        if self.status == status {
            return Ok(());
        }

        let from = self.status;
        self.status = self.status.transition_to(status).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription from {:?} to {:?}",
                    from, status
                ),
            )
            .with_detail("subscription_id", self.id.to_string())
        })?;

        if status == SubscriptionStatus::Active {
            self.activated_at = Some(Timestamp::now());
        }
        self.updated_at = Timestamp::now();

        self.record_event(SubscriptionEvent::StatusChanged {
            subscription_id: self.id,
            from,
            to: status,
        });

        debug!(
            subscription_id = %self.id,
            from = ?from,
            to = ?status,
            "Subscription status changed"
        );

        Ok(())
    }

    // ───────────────────────────────────────────────────────────────
    // Payment Hand-off
    // ───────────────────────────────────────────────────────────────

    /// Builds a payment skeleton carrying this subscription's gateway
    /// details.
    ///
    /// The skeleton has no period or amount yet; period-bound payments
    /// are finished by [`Period::new_payment`].
    pub fn new_payment(&self) -> Payment {
        let mut payment = Payment::new();
        payment.subscription_id = Some(self.id);
        payment.payment_method = self.payment_method.clone();
        payment.description = self.description.clone();
        payment.config_id = self.config_id;
        payment.customer = self.customer.clone();
        payment.billing_address = self.billing_address.clone();
        payment.shipping_address = self.shipping_address.clone();
        payment.lines = self.lines.clone();
        payment
    }

    // ───────────────────────────────────────────────────────────────
    // Internal Helpers
    // ───────────────────────────────────────────────────────────────

    fn record_event(&mut self, event: SubscriptionEvent) {
        self.domain_events.push(event);
    }
}
