//! Subscription phase entity.
//!
//! A phase is a contiguous stretch of a subscription schedule billed at
//! one interval and price: a trial week, a discounted quarter, the open
//! ended regular run. Phases do not know which subscription owns them and
//! they do not track consumption themselves; every question that depends
//! on billing progress takes the subscription's next payment date as an
//! explicit `cursor` argument.

use crate::domain::foundation::{DomainError, ErrorCode, Money, Timestamp};

use super::{Interval, Period};

/// One pricing stretch of a subscription schedule.
///
/// The date range is half open: `start_date` is the first billed day,
/// `end_date` (when present) is the first day no longer covered. A phase
/// without an end date is infinite and keeps producing periods forever.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    sequence_number: u32,
    start_date: Timestamp,
    end_date: Option<Timestamp>,
    interval: Interval,
    amount: Money,
    is_trial: bool,
    is_prorated: bool,
    alignment_rate: Option<f64>,
    canceled_at: Option<Timestamp>,
}

impl Phase {
    /// Creates an infinite phase billing `amount` every `interval` from
    /// `start_date`.
    pub fn new(start_date: Timestamp, interval: Interval, amount: Money) -> Self {
        Self {
            sequence_number: 1,
            start_date,
            end_date: None,
            interval,
            amount,
            is_trial: false,
            is_prorated: false,
            alignment_rate: None,
            canceled_at: None,
        }
    }

    /// Bounds the phase with an exclusive end date.
    pub fn with_end_date(mut self, end_date: Timestamp) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Marks the phase as a trial.
    pub fn with_trial(mut self, trial: bool) -> Self {
        self.is_trial = trial;
        self
    }

    /// Reconstitutes a phase from persisted data.
    ///
    /// This is used when hydrating a subscription snapshot. It bypasses
    /// the builder so every stored field round-trips exactly.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        sequence_number: u32,
        start_date: Timestamp,
        end_date: Option<Timestamp>,
        interval: Interval,
        amount: Money,
        is_trial: bool,
        is_prorated: bool,
        alignment_rate: Option<f64>,
        canceled_at: Option<Timestamp>,
    ) -> Result<Self, DomainError> {
        if sequence_number == 0 {
            return Err(DomainError::validation(
                "sequence_number",
                "phase sequence numbers start at 1",
            ));
        }
        Ok(Self {
            sequence_number,
            start_date,
            end_date,
            interval,
            amount,
            is_trial,
            is_prorated,
            alignment_rate,
            canceled_at,
        })
    }

    // ───────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────

    /// Returns the 1-based position of this phase in its subscription.
    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    /// Returns the first billed day.
    pub fn start_date(&self) -> Timestamp {
        self.start_date
    }

    /// Returns the exclusive end date; None means infinite.
    pub fn end_date(&self) -> Option<Timestamp> {
        self.end_date
    }

    /// Returns the billing interval.
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Returns the configured per-period amount before proration.
    pub fn amount(&self) -> &Money {
        &self.amount
    }

    /// Checks whether this phase is a trial.
    pub fn is_trial(&self) -> bool {
        self.is_trial
    }

    /// Checks whether the alignment rate applies to the amount.
    pub fn is_prorated(&self) -> bool {
        self.is_prorated
    }

    /// Returns the proration rate left behind by alignment, if any.
    pub fn alignment_rate(&self) -> Option<f64> {
        self.alignment_rate
    }

    /// Returns when the phase was canceled, if it was.
    pub fn canceled_at(&self) -> Option<Timestamp> {
        self.canceled_at
    }

    /// Checks whether the phase has no end date.
    pub fn is_infinite(&self) -> bool {
        self.end_date.is_none()
    }

    /// Checks whether the phase has been canceled.
    pub fn is_canceled(&self) -> bool {
        self.canceled_at.is_some()
    }

    // ───────────────────────────────────────────────────────────────
    // Mutators
    // ───────────────────────────────────────────────────────────────

    /// Changes the per-period amount. Periods already produced keep their
    /// captured amount; payments always charge the current one.
    pub fn set_amount(&mut self, amount: Money) {
        self.amount = amount;
    }

    /// Moves or removes the end date.
    pub fn set_end_date(&mut self, end_date: Option<Timestamp>) {
        self.end_date = end_date;
    }

    /// Cancels the phase. The earliest cancellation timestamp wins.
    pub fn cancel(&mut self, at: Timestamp) {
        self.canceled_at.get_or_insert(at);
    }

    pub(crate) fn set_sequence_number(&mut self, sequence_number: u32) {
        self.sequence_number = sequence_number;
    }

    pub(crate) fn set_prorated(&mut self, prorated: bool) {
        self.is_prorated = prorated;
    }

    // ───────────────────────────────────────────────────────────────
    // Period math
    // ───────────────────────────────────────────────────────────────

    /// Returns how many periods the phase contains in total, or None for
    /// an infinite phase. Counted by stepping the interval through the
    /// midnight-normalized date range.
    pub fn total_periods(&self) -> Option<u64> {
        let end = self.end_date?;
        let count = self
            .interval
            .boundaries(self.start_date.at_midnight(), Some(end.at_midnight()))
            .count();
        Some(count as u64)
    }

    /// Returns how many periods have been consumed up to `cursor`.
    ///
    /// A None cursor means nothing further is due, so every period of a
    /// bounded phase counts as created; with no end date either, nothing
    /// was ever produced.
    pub fn periods_created(&self, cursor: Option<Timestamp>) -> u64 {
        let upper = match (cursor, self.end_date) {
            (Some(cursor), Some(end)) => cursor.min(end),
            (Some(cursor), None) => cursor,
            (None, Some(end)) => end,
            (None, None) => return 0,
        };
        self.interval
            .boundaries(self.start_date.at_midnight(), Some(upper.at_midnight()))
            .count() as u64
    }

    /// Returns how many periods are still to come, or None for an
    /// infinite phase.
    pub fn periods_remaining(&self, cursor: Option<Timestamp>) -> Option<u64> {
        self.total_periods()
            .map(|total| total.saturating_sub(self.periods_created(cursor)))
    }

    /// Checks whether every period of the phase has been consumed.
    /// Infinite phases never finish.
    pub fn all_periods_created(&self, cursor: Option<Timestamp>) -> bool {
        match self.end_date {
            None => false,
            Some(end) => match cursor {
                None => true,
                Some(cursor) => !cursor.is_before(&end),
            },
        }
    }

    /// Checks whether the phase is over by `date`. A None date reads as
    /// the far future, which every phase precedes.
    pub fn is_completed_to_date(&self, date: Option<Timestamp>) -> bool {
        let Some(date) = date else {
            return true;
        };
        match self.end_date {
            None => false,
            Some(end) => !date.is_before(&end),
        }
    }

    /// Produces the period beginning at `start`, with its end clamped to
    /// the phase end date.
    ///
    /// Returns None for a start before the phase begins. Returns
    /// `InvalidPeriod` when clamping inverts the range, which means the
    /// start lies beyond the phase end.
    pub fn period_starting_at(&self, start: Timestamp) -> Result<Option<Period>, DomainError> {
        if start.is_before(&self.start_date) {
            return Ok(None);
        }
        let natural_end = self.interval.add_to(start);
        let end = match self.end_date {
            Some(phase_end) if natural_end.is_after(&phase_end) => phase_end,
            _ => natural_end,
        };
        let period = Period::new(
            self.sequence_number,
            start,
            end,
            self.effective_amount(),
            self.is_trial,
        )
        .map_err(|err| {
            DomainError::new(ErrorCode::InvalidPeriod, err.to_string())
                .with_detail("phase", self.sequence_number.to_string())
        })?;
        Ok(Some(period))
    }

    /// Produces the next unconsumed period, or None when the phase is
    /// canceled, the cursor is exhausted, or every period exists already.
    pub fn next_period(&self, cursor: Option<Timestamp>) -> Result<Option<Period>, DomainError> {
        if self.is_canceled() {
            return Ok(None);
        }
        let Some(cursor) = cursor else {
            return Ok(None);
        };
        if self.all_periods_created(Some(cursor)) {
            return Ok(None);
        }
        self.period_starting_at(cursor)
    }

    /// Returns the amount a period of this phase charges right now: the
    /// configured amount, prorated when alignment shortened the phase.
    pub fn effective_amount(&self) -> Money {
        match self.alignment_rate {
            Some(rate) if self.is_prorated => self.amount.prorate(rate),
            _ => self.amount.clone(),
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Alignment
    // ───────────────────────────────────────────────────────────────

    /// Splits a phase at `align_date`, carving out the shortened run-up.
    ///
    /// Returns the pair `(alignment_phase, shifted_original)`. The
    /// alignment phase covers `[start, align_date)` with a day-count
    /// interval and carries the proration rate `actual / regular` days.
    /// The original moves its start to `align_date` and pushes any end
    /// date out by the same day count so no periods are lost.
    ///
    /// # Errors
    ///
    /// Returns `AlignmentFailed` when the align date is not after the
    /// phase start or the interval spans no whole day.
    pub fn align(phase: &Phase, align_date: Timestamp) -> Result<(Phase, Phase), DomainError> {
        let start = phase.start_date;
        let regular_days = start.days_until(&phase.interval.add_to(start));
        let alignment_days = start.days_until(&align_date);

        if regular_days <= 0 || alignment_days <= 0 {
            return Err(DomainError::new(
                ErrorCode::AlignmentFailed,
                "alignment requires a positive day span",
            )
            .with_detail("regular_days", regular_days.to_string())
            .with_detail("alignment_days", alignment_days.to_string()));
        }

        let alignment_interval = Interval::days(alignment_days as u32)
            .map_err(|err| DomainError::new(ErrorCode::AlignmentFailed, err.to_string()))?;

        let mut alignment_phase = phase.clone();
        alignment_phase.interval = alignment_interval;
        alignment_phase.end_date = Some(align_date);
        alignment_phase.alignment_rate = Some(alignment_days as f64 / regular_days as f64);

        let mut shifted = phase.clone();
        shifted.start_date = align_date;
        shifted.end_date = phase.end_date.map(|end| end.add_days(alignment_days));

        Ok((alignment_phase, shifted))
    }
}
