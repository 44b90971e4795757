//! Tests for payment selection and the settlement state machine

use std::sync::Arc;

use rust_decimal::Decimal;

use tappay_wallet::error::Error;
use tappay_wallet::ledger::{FundingSource, Ledger};
use tappay_wallet::payment::engine::PaymentEngine;
use tappay_wallet::payment::ChargePhase;
use tappay_wallet::verification::{VerificationState, VerifiedIdentity};

fn source(id: &str, priority: u32, balance: i64, requires_verification: bool) -> FundingSource {
    FundingSource::new(
        id,
        id.to_uppercase(),
        priority,
        Decimal::from(balance),
        requires_verification,
    )
}

fn wallet(
    sources: Vec<FundingSource>,
) -> (Arc<Ledger>, Arc<VerificationState>, Arc<PaymentEngine>) {
    let ledger = Arc::new(Ledger::with_sources(sources));
    let verification = Arc::new(VerificationState::new());
    let engine = Arc::new(PaymentEngine::new(ledger.clone(), verification.clone()));
    (ledger, verification, engine)
}

fn identity() -> VerifiedIdentity {
    VerifiedIdentity {
        nationality: "AR".to_string(),
        document_number: "X123".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn charge_selects_first_source_with_sufficient_balance() {
    let (ledger, _, engine) =
        wallet(vec![source("a", 1, 40, false), source("b", 2, 100, false)]);

    // a's balance (40) cannot cover 55, so b settles the charge
    let receipt = engine.charge(Decimal::from(55)).await.unwrap();
    assert_eq!(receipt.source_id, "b");
    assert_eq!(receipt.new_balance, Decimal::from(45));

    assert_eq!(ledger.get("a").await.unwrap().balance, Decimal::from(40));
    assert_eq!(ledger.get("b").await.unwrap().balance, Decimal::from(45));
}

#[tokio::test(start_paused = true)]
async fn gated_source_is_ineligible_while_unverified() {
    let (ledger, verification, engine) = wallet(vec![source("a", 1, 1000, true)]);

    // plenty of balance, but the verification gate makes it ineligible
    let err = engine.charge(Decimal::from(10)).await.unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds(_)));
    assert_eq!(ledger.get("a").await.unwrap().balance, Decimal::from(1000));

    // verification unlocks it
    verification.set_verified(Some(identity())).await;
    let receipt = engine.charge(Decimal::from(10)).await.unwrap();
    assert_eq!(receipt.source_id, "a");
    assert_eq!(receipt.new_balance, Decimal::from(990));
}

#[tokio::test(start_paused = true)]
async fn forgetting_the_identity_re_gates_sources() {
    let (_, verification, engine) = wallet(vec![source("a", 1, 1000, true)]);

    verification.set_verified(Some(identity())).await;
    engine.charge(Decimal::from(10)).await.unwrap();

    verification.forget().await;
    let err = engine.charge(Decimal::from(10)).await.unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds(_)));
}

#[tokio::test(start_paused = true)]
async fn unlinked_source_is_skipped() {
    let (_, _, engine) = wallet(vec![
        source("a", 1, 1000, false).unlinked(),
        source("b", 2, 100, false),
    ]);

    let receipt = engine.charge(Decimal::from(10)).await.unwrap();
    assert_eq!(receipt.source_id, "b");
}

#[tokio::test(start_paused = true)]
async fn source_with_live_pending_transaction_is_skipped() {
    let (ledger, _, engine) = wallet(vec![source("a", 1, 100, false), source("b", 2, 100, false)]);
    ledger
        .register_pending_transaction("a", Decimal::from(5), "0xabc")
        .await
        .unwrap();

    let receipt = engine.charge(Decimal::from(10)).await.unwrap();
    assert_eq!(receipt.source_id, "b");
}

#[tokio::test(start_paused = true)]
async fn balance_commits_at_the_paid_transition() {
    let (ledger, _, engine) = wallet(vec![source("a", 1, 100, false)]);
    let mut status = engine.subscribe();

    let charge = tokio::spawn({
        let engine = engine.clone();
        async move { engine.charge(Decimal::from(10)).await }
    });

    status.changed().await.unwrap();
    assert_eq!(status.borrow().phase, ChargePhase::Processing);
    // nothing is committed while the terminal round-trip is simulated
    assert_eq!(ledger.total_balance().await, Decimal::from(100));

    status.changed().await.unwrap();
    assert_eq!(status.borrow().phase, ChargePhase::Paid);
    assert_eq!(ledger.total_balance().await, Decimal::from(90));

    let receipt = charge.await.unwrap().unwrap();
    assert_eq!(receipt.new_balance, Decimal::from(90));

    // the paid indicator clears back to idle after the display window
    status.changed().await.unwrap();
    assert_eq!(status.borrow().phase, ChargePhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn failed_charge_dismisses_then_clears_the_error() {
    let (ledger, _, engine) = wallet(vec![source("a", 1, 5, false)]);
    let mut status = engine.subscribe();

    let charge = tokio::spawn({
        let engine = engine.clone();
        async move { engine.charge(Decimal::from(10)).await }
    });

    status.changed().await.unwrap();
    assert_eq!(status.borrow().phase, ChargePhase::Processing);

    status.changed().await.unwrap();
    {
        let current = status.borrow();
        assert_eq!(current.phase, ChargePhase::Failed);
        assert!(current.error_message.is_some());
    }
    assert!(matches!(
        charge.await.unwrap(),
        Err(Error::InsufficientFunds(_))
    ));

    // the charge screen is dismissed first; the message lingers
    status.changed().await.unwrap();
    {
        let current = status.borrow();
        assert_eq!(current.phase, ChargePhase::Idle);
        assert!(current.error_message.is_some());
    }

    // then the message clears on its own
    status.changed().await.unwrap();
    {
        let current = status.borrow();
        assert_eq!(current.phase, ChargePhase::Idle);
        assert!(current.error_message.is_none());
    }

    // no balance was mutated on the failure path
    assert_eq!(ledger.total_balance().await, Decimal::from(5));
}

#[tokio::test(start_paused = true)]
async fn second_charge_is_rejected_while_processing() {
    let (_, _, engine) = wallet(vec![source("a", 1, 100, false)]);
    let mut status = engine.subscribe();

    let charge = tokio::spawn({
        let engine = engine.clone();
        async move { engine.charge(Decimal::from(10)).await }
    });

    status.changed().await.unwrap();
    assert_eq!(status.borrow().phase, ChargePhase::Processing);

    let err = engine.charge(Decimal::from(10)).await.unwrap_err();
    assert!(matches!(err, Error::ChargeInProgress));

    // the in-flight charge is unaffected
    assert!(charge.await.unwrap().is_ok());
}

#[tokio::test(start_paused = true)]
async fn cancel_is_ignored_mid_flight() {
    let (_, _, engine) = wallet(vec![source("a", 1, 100, false)]);
    let mut status = engine.subscribe();

    let charge = tokio::spawn({
        let engine = engine.clone();
        async move { engine.charge(Decimal::from(10)).await }
    });

    status.changed().await.unwrap();
    assert_eq!(status.borrow().phase, ChargePhase::Processing);
    assert!(!engine.cancel().await);

    // once the charge reaches a terminal phase, cancel is honored
    status.changed().await.unwrap();
    assert_eq!(status.borrow().phase, ChargePhase::Paid);
    assert!(charge.await.unwrap().is_ok());

    assert!(engine.cancel().await);
    assert_eq!(status.borrow().phase, ChargePhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn random_terminal_amount_stays_in_range() {
    let (_, _, engine) = wallet(vec![source("a", 1, 1000, false)]);

    let receipt = engine.charge_random().await.unwrap();
    assert!(receipt.amount >= Decimal::from(50));
    assert!(receipt.amount <= Decimal::from(59));
}
