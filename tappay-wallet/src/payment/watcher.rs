//! Pending-transaction watcher
//!
//! Polls an external transaction-status oracle until a pending deposit
//! confirms, then instructs the ledger to credit the funding source. The
//! polling interval and the wall-clock timeout race inside one task;
//! whichever fires first wins and both are dropped together.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::ledger::Ledger;

/// External transaction-status oracle.
///
/// Typically backed by a third-party wallet/chain library; the contract is
/// "eventually true or never".
#[async_trait]
pub trait TransactionOracle: Send + Sync {
    /// Whether the referenced transaction has confirmed on the external network
    async fn is_confirmed(&self, transaction_reference: &str) -> Result<bool>;
}

/// Watcher timing configuration
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub poll_interval: Duration,
    /// Wall-clock bound on the whole watch
    pub timeout: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            timeout: Duration::from_millis(30_000),
        }
    }
}

/// Terminal outcome of one watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The oracle confirmed; the pending amount was credited
    Confirmed { credited: Decimal },
    /// The timeout elapsed first; the pending transaction is left registered
    TimedOut,
}

/// Watches one pending transaction per call until confirmation or timeout
pub struct PendingTransactionWatcher {
    ledger: Arc<Ledger>,
    oracle: Arc<dyn TransactionOracle>,
    config: WatcherConfig,
}

impl PendingTransactionWatcher {
    /// Create a watcher with the default polling timings
    pub fn new(ledger: Arc<Ledger>, oracle: Arc<dyn TransactionOracle>) -> Self {
        Self::with_config(ledger, oracle, WatcherConfig::default())
    }

    pub fn with_config(
        ledger: Arc<Ledger>,
        oracle: Arc<dyn TransactionOracle>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            ledger,
            oracle,
            config,
        }
    }

    /// Watch the given source's pending transaction to completion.
    ///
    /// On confirmation the ledger's pending slot is cleared and its amount
    /// credited exactly once. On timeout the slot is left as-is; the caller
    /// decides whether to surface that. Transient oracle errors are swallowed
    /// and retried on the next tick.
    pub async fn watch(
        &self,
        source_id: &str,
        transaction_reference: &str,
    ) -> Result<WatchOutcome> {
        let mut ticks = interval(self.config.poll_interval);
        // discard the immediate tick; the first status check happens after
        // one full interval
        ticks.tick().await;

        let deadline = sleep(self.config.timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    warn!(source_id, transaction_reference, "pending transaction watch timed out");
                    return Ok(WatchOutcome::TimedOut);
                }
                _ = ticks.tick() => {
                    match self.oracle.is_confirmed(transaction_reference).await {
                        Ok(true) => {
                            let credited = self.ledger.clear_pending_transaction(source_id).await?;
                            info!(source_id, %credited, "pending transaction confirmed");
                            return Ok(WatchOutcome::Confirmed { credited });
                        }
                        Ok(false) => {}
                        Err(error) => {
                            debug!(source_id, %error, "transaction status check failed, retrying");
                        }
                    }
                }
            }
        }
    }

    /// Spawn the watch as a detached task
    pub fn spawn(
        self: Arc<Self>,
        source_id: String,
        transaction_reference: String,
    ) -> JoinHandle<Result<WatchOutcome>> {
        tokio::spawn(async move { self.watch(&source_id, &transaction_reference).await })
    }
}
