//! Payment selection and settlement engine
//!
//! Models an asynchronous tap-to-pay terminal: a charge sits in
//! `Processing` for a fixed simulated duration, then either commits a
//! balance deduction against the first eligible funding source or fails
//! with a user-facing message that clears on a timer.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::payment::{ChargePhase, ChargeReceipt, ChargeStatus, PaymentConfig};
use crate::verification::VerificationState;

/// The settlement engine.
///
/// One charge runs at a time. The charge state machine
/// (`Idle -> Processing -> {Paid, Failed} -> Idle`) is published through a
/// watch channel; the trailing display/clear timers run as a single owned
/// task that is aborted whenever a new charge takes over, so a stale timer
/// can never fire into a later charge's state.
pub struct PaymentEngine {
    ledger: Arc<Ledger>,
    verification: Arc<VerificationState>,
    config: PaymentConfig,
    status_tx: watch::Sender<ChargeStatus>,
    tail_task: Mutex<Option<JoinHandle<()>>>,
}

impl PaymentEngine {
    /// Create an engine with the default terminal timings
    pub fn new(ledger: Arc<Ledger>, verification: Arc<VerificationState>) -> Self {
        Self::with_config(ledger, verification, PaymentConfig::default())
    }

    pub fn with_config(
        ledger: Arc<Ledger>,
        verification: Arc<VerificationState>,
        config: PaymentConfig,
    ) -> Self {
        let (status_tx, _) = watch::channel(ChargeStatus::idle());
        Self {
            ledger,
            verification,
            config,
            status_tx,
            tail_task: Mutex::new(None),
        }
    }

    /// Subscribe to charge state transitions
    pub fn subscribe(&self) -> watch::Receiver<ChargeStatus> {
        self.status_tx.subscribe()
    }

    /// Latest charge status
    pub fn status(&self) -> ChargeStatus {
        self.status_tx.borrow().clone()
    }

    /// Run one tap-to-pay charge to completion.
    ///
    /// Funding sources are tried in ascending priority order; a source is
    /// skipped if it has a live pending transaction, requires verification
    /// while the owner is unverified, has no linked account, or cannot cover
    /// the amount. The balance commit happens at the `Paid` transition.
    /// Returns `ChargeInProgress` if another charge is still processing.
    pub async fn charge(&self, amount: Decimal) -> Result<ChargeReceipt> {
        if amount.is_sign_negative() {
            return Err(Error::InvalidAmount(amount));
        }

        {
            let mut tail = self.tail_task.lock().await;
            if self.status_tx.borrow().phase == ChargePhase::Processing {
                return Err(Error::ChargeInProgress);
            }
            // a new charge takes over; stop the previous charge's tail timer
            if let Some(previous) = tail.take() {
                previous.abort();
            }
            self.status_tx.send_replace(ChargeStatus {
                phase: ChargePhase::Processing,
                error_message: None,
            });
        }
        info!(%amount, "charge entered processing");

        // the simulated terminal round-trip; no cancellation mid-flight
        sleep(self.config.processing_delay).await;

        let verified = self.verification.is_verified().await;
        let selected = self
            .ledger
            .list_ordered_by_priority()
            .await
            .into_iter()
            .find(|source| source.can_fund(amount, verified));

        match selected {
            Some(source) => {
                let new_balance = source.balance - amount;
                self.ledger.set_balance(&source.id, new_balance).await?;
                info!(source_id = %source.id, %new_balance, "charge committed");

                let status_tx = self.status_tx.clone();
                let paid_display = self.config.paid_display;
                // terminal transition and tail timer install together, so a
                // takeover by a new charge can never race a stale timer
                let mut tail = self.tail_task.lock().await;
                self.status_tx.send_replace(ChargeStatus {
                    phase: ChargePhase::Paid,
                    error_message: None,
                });
                let handle = tokio::spawn(async move {
                    sleep(paid_display).await;
                    status_tx.send_replace(ChargeStatus::idle());
                });
                if let Some(previous) = tail.replace(handle) {
                    previous.abort();
                }

                Ok(ChargeReceipt {
                    source_id: source.id,
                    amount,
                    new_balance,
                    charged_at: Utc::now(),
                })
            }
            None => {
                let message = "Primary payment method has insufficient funds".to_string();
                warn!(%amount, "no eligible funding source");

                let status_tx = self.status_tx.clone();
                let failed_dismiss = self.config.failed_dismiss;
                let error_clear = self.config.error_clear;
                let mut tail = self.tail_task.lock().await;
                self.status_tx.send_replace(ChargeStatus {
                    phase: ChargePhase::Failed,
                    error_message: Some(message),
                });
                let handle = tokio::spawn(async move {
                    sleep(failed_dismiss).await;
                    // charge screen dismissed; the message lingers a while longer
                    status_tx.send_modify(|status| status.phase = ChargePhase::Idle);
                    sleep(error_clear).await;
                    status_tx.send_replace(ChargeStatus::idle());
                });
                if let Some(previous) = tail.replace(handle) {
                    previous.abort();
                }

                Err(Error::InsufficientFunds(amount))
            }
        }
    }

    /// Charge a random simulated terminal amount (50..=59)
    pub async fn charge_random(&self) -> Result<ChargeReceipt> {
        let amount: i64 = rand::thread_rng().gen_range(50..60);
        self.charge(Decimal::from(amount)).await
    }

    /// Cancel the current charge screen.
    ///
    /// Honored only outside `Processing`; once the terminal round-trip has
    /// begun it always runs to completion. Returns whether the cancel took
    /// effect.
    pub async fn cancel(&self) -> bool {
        let mut tail = self.tail_task.lock().await;
        if self.status_tx.borrow().phase == ChargePhase::Processing {
            return false;
        }
        if let Some(previous) = tail.take() {
            previous.abort();
        }
        self.status_tx.send_replace(ChargeStatus::idle());
        true
    }
}
