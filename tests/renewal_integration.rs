//! Integration tests for the renewal flow through the ports.
//!
//! These tests verify the loop the surrounding plugin runs:
//! 1. The repository hands back subscriptions that are due
//! 2. Payments left open past their window are abandoned at the gateway
//! 3. The renewal decision picks a period, honoring retries
//! 4. A payment is assembled and pushed through the gateway
//! 5. Payment outcomes drive the subscription status contract
//!
//! Uses in-memory implementations to test the flow without external
//! dependencies. The repository stores snapshots, so every save and
//! load also exercises the persistence round-trip.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use cadence_billing::domain::billing::{Interval, Phase};
use cadence_billing::domain::foundation::{
    Currency, DomainError, ErrorCode, Money, SubscriptionId, SubscriptionKey, Timestamp,
};
use cadence_billing::domain::payment::{Payment, PaymentStatus};
use cadence_billing::domain::subscription::{Subscription, SubscriptionStatus};
use cadence_billing::ports::{
    GatewayError, GatewayReference, PaymentGateway, SubscriptionRepository,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

/// In-memory repository storing subscriptions as snapshots.
struct TestSubscriptionRepository {
    snapshots: RwLock<HashMap<SubscriptionId, serde_json::Value>>,
}

impl TestSubscriptionRepository {
    fn new() -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    fn encode(subscription: &Subscription) -> Result<serde_json::Value, DomainError> {
        serde_json::to_value(subscription.to_snapshot())
            .map_err(|e| DomainError::new(ErrorCode::StorageError, e.to_string()))
    }

    fn decode(value: &serde_json::Value) -> Result<Subscription, DomainError> {
        let snapshot = serde_json::from_value(value.clone())
            .map_err(|e| DomainError::new(ErrorCode::StorageError, e.to_string()))?;
        Subscription::from_snapshot(snapshot)
    }
}

#[async_trait]
impl SubscriptionRepository for TestSubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let value = Self::encode(subscription)?;
        self.snapshots.write().await.insert(subscription.id(), value);
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut snapshots = self.snapshots.write().await;
        if !snapshots.contains_key(&subscription.id()) {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription not found: {}", subscription.id()),
            ));
        }
        snapshots.insert(subscription.id(), Self::encode(subscription)?);
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        let snapshots = self.snapshots.read().await;
        snapshots.get(id).map(Self::decode).transpose()
    }

    async fn find_by_key(
        &self,
        key: &SubscriptionKey,
    ) -> Result<Option<Subscription>, DomainError> {
        let snapshots = self.snapshots.read().await;
        for value in snapshots.values() {
            let subscription = Self::decode(value)?;
            if subscription.key() == key {
                return Ok(Some(subscription));
            }
        }
        Ok(None)
    }

    async fn find_due_before(&self, date: Timestamp) -> Result<Vec<Subscription>, DomainError> {
        let snapshots = self.snapshots.read().await;
        let mut due = Vec::new();
        for value in snapshots.values() {
            let subscription = Self::decode(value)?;
            let is_due = subscription
                .next_payment_date()
                .map(|payment_date| !payment_date.is_after(&date))
                .unwrap_or(false);
            if is_due {
                due.push(subscription);
            }
        }
        Ok(due)
    }

    async fn delete(&self, id: &SubscriptionId) -> Result<(), DomainError> {
        let mut snapshots = self.snapshots.write().await;
        if snapshots.remove(id).is_none() {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription not found: {}", id),
            ));
        }
        Ok(())
    }
}

/// Gateway double that records created payments and reports a
/// configurable status.
struct RecordingGateway {
    created: RwLock<Vec<Payment>>,
    statuses: RwLock<HashMap<String, PaymentStatus>>,
}

impl RecordingGateway {
    fn new() -> Self {
        Self {
            created: RwLock::new(Vec::new()),
            statuses: RwLock::new(HashMap::new()),
        }
    }

    async fn created_count(&self) -> usize {
        self.created.read().await.len()
    }

    async fn last_created(&self) -> Option<Payment> {
        self.created.read().await.last().cloned()
    }

    async fn report_status(&self, reference: &GatewayReference, status: PaymentStatus) {
        self.statuses
            .write()
            .await
            .insert(reference.as_str().to_string(), status);
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_payment(&self, payment: &Payment) -> Result<GatewayReference, GatewayError> {
        let reference = GatewayReference::new(format!("tr_{}", payment.id));
        self.created.write().await.push(payment.clone());
        self.statuses
            .write()
            .await
            .insert(reference.as_str().to_string(), PaymentStatus::Open);
        Ok(reference)
    }

    async fn payment_status(
        &self,
        reference: &GatewayReference,
    ) -> Result<PaymentStatus, GatewayError> {
        self.statuses
            .read()
            .await
            .get(reference.as_str())
            .copied()
            .ok_or_else(|| GatewayError::not_found("Payment"))
    }

    async fn cancel_payment(&self, reference: &GatewayReference) -> Result<(), GatewayError> {
        self.statuses
            .write()
            .await
            .insert(reference.as_str().to_string(), PaymentStatus::Cancelled);
        Ok(())
    }
}

/// Gateway double that always fails with a network error.
struct UnreachableGateway;

#[async_trait]
impl PaymentGateway for UnreachableGateway {
    async fn create_payment(&self, _payment: &Payment) -> Result<GatewayReference, GatewayError> {
        Err(GatewayError::network("connection refused"))
    }

    async fn payment_status(
        &self,
        _reference: &GatewayReference,
    ) -> Result<PaymentStatus, GatewayError> {
        Err(GatewayError::network("connection refused"))
    }

    async fn cancel_payment(&self, _reference: &GatewayReference) -> Result<(), GatewayError> {
        Err(GatewayError::network("connection refused"))
    }
}

fn eur(amount: i64) -> Money {
    Money::new(amount, Currency::eur())
}

fn date(year: i32, month: u32, day: u32) -> Timestamp {
    Timestamp::from_ymd(year, month, day).unwrap()
}

fn active_monthly_subscription() -> Subscription {
    let mut subscription = Subscription::new(SubscriptionKey::generate())
        .with_payment_method("ideal")
        .with_description("Premium plan");
    subscription.add_phase(Phase::new(date(2024, 1, 1), Interval::MONTH, eur(1000)));
    subscription.set_status(SubscriptionStatus::Active).unwrap();
    subscription
}

/// Charges one due period: decides the period, assembles the payment,
/// pushes it to the gateway, and persists the advanced cursor.
async fn charge_next_period(
    repo: &dyn SubscriptionRepository,
    gateway: &dyn PaymentGateway,
    id: SubscriptionId,
    payments: &[Payment],
    now: Timestamp,
) -> Result<Option<(Payment, GatewayReference)>, DomainError> {
    let Some(mut subscription) = repo.find_by_id(&id).await? else {
        return Err(DomainError::new(
            ErrorCode::SubscriptionNotFound,
            format!("Subscription not found: {}", id),
        ));
    };

    let Some(period) = subscription.renewal_period(payments, now)? else {
        return Ok(None);
    };

    let mut payment = period.new_payment(&subscription)?;
    let reference = gateway.create_payment(&payment).await?;
    payment.set_status(gateway.payment_status(&reference).await?)?;

    // Advance the cursor only past freshly consumed periods; a retried
    // period was consumed when it was first charged.
    if Some(period.start_date()) == subscription.next_payment_date() {
        subscription.next_period()?;
    }
    repo.update(&subscription).await?;

    Ok(Some((payment, reference)))
}

/// Abandons a payment at the gateway when its billing window has lapsed
/// while the payment is still open. Returns whether a cancellation was
/// issued.
async fn cancel_lapsed_payment(
    gateway: &dyn PaymentGateway,
    payment: &Payment,
    reference: &GatewayReference,
    now: Timestamp,
) -> Result<bool, DomainError> {
    let Some(period) = payment.period.as_ref() else {
        return Ok(false);
    };
    if period.end_date().is_after(&now) {
        return Ok(false);
    }
    if gateway.payment_status(reference).await? != PaymentStatus::Open {
        return Ok(false);
    }
    gateway.cancel_payment(reference).await?;
    Ok(true)
}

// =============================================================================
// Integration Tests
// =============================================================================

/// Tests the happy renewal path: a due subscription is picked up, its
/// period charged, and the stored cursor moves to the period end.
#[tokio::test]
async fn due_subscription_is_charged_and_advanced() {
    let repo = TestSubscriptionRepository::new();
    let gateway = RecordingGateway::new();

    let subscription = active_monthly_subscription();
    let id = subscription.id();
    repo.save(&subscription).await.unwrap();

    let due = repo.find_due_before(date(2024, 1, 1)).await.unwrap();
    assert_eq!(due.len(), 1);

    let (payment, _reference) = charge_next_period(&repo, &gateway, id, &[], date(2024, 1, 1))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(payment.total_amount, Some(eur(1000)));
    assert_eq!(payment.payment_method.as_deref(), Some("ideal"));
    let period = payment.period.as_ref().unwrap();
    assert_eq!(period.start_date(), date(2024, 1, 1));
    assert_eq!(period.end_date(), date(2024, 2, 1));

    assert_eq!(gateway.created_count().await, 1);

    let stored = repo.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(stored.next_payment_date(), Some(date(2024, 2, 1)));
}

/// Subscriptions that are not due yet, or have nothing left to bill,
/// stay out of the sweep.
#[tokio::test]
async fn sweep_only_picks_up_due_subscriptions() {
    let repo = TestSubscriptionRepository::new();

    let due = active_monthly_subscription();
    repo.save(&due).await.unwrap();

    let mut not_due = active_monthly_subscription();
    not_due.set_next_payment_date(Some(date(2024, 3, 1)));
    repo.save(&not_due).await.unwrap();

    let mut exhausted = Subscription::new(SubscriptionKey::generate());
    exhausted.add_phase(
        Phase::new(date(2023, 1, 1), Interval::MONTH, eur(1000)).with_end_date(date(2023, 2, 1)),
    );
    exhausted.next_period().unwrap();
    assert!(exhausted.next_payment_date().is_none());
    repo.save(&exhausted).await.unwrap();

    let swept = repo.find_due_before(date(2024, 1, 15)).await.unwrap();
    assert_eq!(swept.len(), 1);
    assert_eq!(swept[0].id(), due.id());
}

/// Tests the retry loop: a failed charge is retried against the same
/// billing window, the subscription goes on hold meanwhile, and a
/// successful retry resumes it and moves on to the next period.
#[tokio::test]
async fn failed_charge_is_retried_then_resumed() {
    let repo = TestSubscriptionRepository::new();
    let gateway = RecordingGateway::new();

    let subscription = active_monthly_subscription();
    let id = subscription.id();
    repo.save(&subscription).await.unwrap();

    // First charge fails at the gateway.
    let (mut first_payment, reference) =
        charge_next_period(&repo, &gateway, id, &[], date(2024, 1, 1))
            .await
            .unwrap()
            .unwrap();
    gateway
        .report_status(&reference, PaymentStatus::Failure)
        .await;
    first_payment
        .set_status(gateway.payment_status(&reference).await.unwrap())
        .unwrap();

    // Payment policy puts the subscription on hold.
    let mut on_hold = repo.find_by_id(&id).await.unwrap().unwrap();
    on_hold.set_status(SubscriptionStatus::OnHold).unwrap();
    repo.update(&on_hold).await.unwrap();

    // The retry a few days later re-offers the January window.
    let history = vec![first_payment.clone()];
    let (mut retry_payment, retry_reference) =
        charge_next_period(&repo, &gateway, id, &history, date(2024, 1, 10))
            .await
            .unwrap()
            .unwrap();
    let retried = retry_payment.period.as_ref().unwrap();
    assert_eq!(retried.start_date(), date(2024, 1, 1));
    assert_eq!(retried.end_date(), date(2024, 2, 1));

    // The retry succeeds; policy resumes the subscription.
    gateway
        .report_status(&retry_reference, PaymentStatus::Success)
        .await;
    retry_payment
        .set_status(gateway.payment_status(&retry_reference).await.unwrap())
        .unwrap();

    let mut resumed = repo.find_by_id(&id).await.unwrap().unwrap();
    resumed.set_status(SubscriptionStatus::Active).unwrap();
    repo.update(&resumed).await.unwrap();

    // With the window covered, the next decision moves to February.
    let history = vec![first_payment, retry_payment];
    let stored = repo.find_by_id(&id).await.unwrap().unwrap();
    let next = stored
        .renewal_period(&history, date(2024, 1, 12))
        .unwrap()
        .unwrap();
    assert_eq!(next.start_date(), date(2024, 2, 1));

    // The cursor never moved past February during the retry.
    assert_eq!(stored.next_payment_date(), Some(date(2024, 2, 1)));
    assert_eq!(stored.status(), SubscriptionStatus::Active);
}

/// A failed charge whose billing window has already closed is not
/// retried; collection moves on to the current window.
#[tokio::test]
async fn expired_window_is_not_retried() {
    let repo = TestSubscriptionRepository::new();
    let gateway = RecordingGateway::new();

    let subscription = active_monthly_subscription();
    let id = subscription.id();
    repo.save(&subscription).await.unwrap();

    let (mut payment, reference) = charge_next_period(&repo, &gateway, id, &[], date(2024, 1, 1))
        .await
        .unwrap()
        .unwrap();
    gateway
        .report_status(&reference, PaymentStatus::Failure)
        .await;
    payment
        .set_status(gateway.payment_status(&reference).await.unwrap())
        .unwrap();

    // Well past the January window.
    let history = vec![payment];
    let (next_payment, _) =
        charge_next_period(&repo, &gateway, id, &history, date(2024, 2, 15))
            .await
            .unwrap()
            .unwrap();
    let period = next_payment.period.as_ref().unwrap();
    assert_eq!(period.start_date(), date(2024, 2, 1));
}

/// A payment left open past its billing window is cancelled at the
/// gateway before the next window is charged, and the abandoned window
/// is not retried.
#[tokio::test]
async fn lapsed_open_payment_is_cancelled_before_next_charge() {
    let repo = TestSubscriptionRepository::new();
    let gateway = RecordingGateway::new();

    let subscription = active_monthly_subscription();
    let id = subscription.id();
    repo.save(&subscription).await.unwrap();

    // The customer abandons checkout; the payment stays open at the
    // gateway for the whole January window.
    let (mut stale_payment, stale_reference) =
        charge_next_period(&repo, &gateway, id, &[], date(2024, 1, 1))
            .await
            .unwrap()
            .unwrap();

    // Mid-window the open payment is left alone.
    let cancelled =
        cancel_lapsed_payment(&gateway, &stale_payment, &stale_reference, date(2024, 1, 20))
            .await
            .unwrap();
    assert!(!cancelled);

    // Once the window lapses the sweep abandons it.
    let cancelled =
        cancel_lapsed_payment(&gateway, &stale_payment, &stale_reference, date(2024, 2, 15))
            .await
            .unwrap();
    assert!(cancelled);
    assert_eq!(
        gateway.payment_status(&stale_reference).await.unwrap(),
        PaymentStatus::Cancelled
    );
    stale_payment
        .set_status(gateway.payment_status(&stale_reference).await.unwrap())
        .unwrap();

    // A second sweep finds nothing open and issues no cancellation.
    let cancelled =
        cancel_lapsed_payment(&gateway, &stale_payment, &stale_reference, date(2024, 2, 15))
            .await
            .unwrap();
    assert!(!cancelled);

    // The cancelled window is not retried; collection charges February.
    let history = vec![stale_payment];
    let (next_payment, _) = charge_next_period(&repo, &gateway, id, &history, date(2024, 2, 15))
        .await
        .unwrap()
        .unwrap();
    let period = next_payment.period.as_ref().unwrap();
    assert_eq!(period.start_date(), date(2024, 2, 1));
    assert_eq!(gateway.created_count().await, 2);
}

/// The repository contract: lookups by key, updates requiring a saved
/// aggregate, and deletes.
#[tokio::test]
async fn repository_contract_round_trips_subscriptions() {
    let repo = TestSubscriptionRepository::new();

    let subscription = active_monthly_subscription();
    repo.save(&subscription).await.unwrap();

    let by_key = repo
        .find_by_key(subscription.key())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_key.id(), subscription.id());
    assert_eq!(by_key.phases(), subscription.phases());

    let unsaved = active_monthly_subscription();
    let err = repo.update(&unsaved).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::SubscriptionNotFound);

    repo.delete(&subscription.id()).await.unwrap();
    assert!(repo
        .find_by_id(&subscription.id())
        .await
        .unwrap()
        .is_none());
}

/// Gateway failures surface as domain errors without touching the
/// stored subscription.
#[tokio::test]
async fn gateway_failure_leaves_the_subscription_untouched() {
    let repo = TestSubscriptionRepository::new();
    let gateway = UnreachableGateway;

    let subscription = active_monthly_subscription();
    let id = subscription.id();
    repo.save(&subscription).await.unwrap();

    let result = charge_next_period(&repo, &gateway, id, &[], date(2024, 1, 1)).await;
    let err = result.unwrap_err();
    assert_eq!(err.code, ErrorCode::GatewayError);

    let stored = repo.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(stored.next_payment_date(), Some(date(2024, 1, 1)));
}

/// Concurrent readers see a consistent snapshot while a writer holds
/// the aggregate.
#[tokio::test]
async fn repository_is_shareable_across_tasks() {
    let repo = Arc::new(TestSubscriptionRepository::new());
    let subscription = active_monthly_subscription();
    let id = subscription.id();
    repo.save(&subscription).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let repo = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            repo.find_by_id(&id).await.unwrap().unwrap().id()
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), id);
    }
}
