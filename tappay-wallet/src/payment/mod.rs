//! Payment selection, settlement and deposit watching

pub mod engine;
pub mod watcher;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

/// Charge lifecycle phase.
///
/// `Idle` is both the initial and the terminal state between charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargePhase {
    Idle,
    Processing,
    Paid,
    Failed,
}

impl From<ChargePhase> for String {
    fn from(phase: ChargePhase) -> Self {
        match phase {
            ChargePhase::Idle => "idle".to_string(),
            ChargePhase::Processing => "processing".to_string(),
            ChargePhase::Paid => "paid".to_string(),
            ChargePhase::Failed => "failed".to_string(),
        }
    }
}

impl TryFrom<String> for ChargePhase {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "idle" => Ok(ChargePhase::Idle),
            "processing" => Ok(ChargePhase::Processing),
            "paid" => Ok(ChargePhase::Paid),
            "failed" => Ok(ChargePhase::Failed),
            _ => Err(format!("Invalid charge phase: {}", value)),
        }
    }
}

/// Point-in-time view of the charge state machine.
///
/// The error message outlives the `Failed` phase: it stays visible for a
/// short window after the charge screen is dismissed, then clears on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeStatus {
    pub phase: ChargePhase,
    pub error_message: Option<String>,
}

impl ChargeStatus {
    pub fn idle() -> Self {
        Self {
            phase: ChargePhase::Idle,
            error_message: None,
        }
    }
}

impl Default for ChargeStatus {
    fn default() -> Self {
        Self::idle()
    }
}

/// Receipt for a committed charge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeReceipt {
    pub source_id: String,
    pub amount: Decimal,
    pub new_balance: Decimal,
    pub charged_at: DateTime<Utc>,
}

/// Timing configuration for the simulated payment terminal
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Time a charge spends in `Processing` before its outcome is visible
    pub processing_delay: Duration,
    /// How long the `Paid` indicator stays up before returning to `Idle`
    pub paid_display: Duration,
    /// Delay before a failed charge screen is dismissed
    pub failed_dismiss: Duration,
    /// Additional delay before the failure message clears
    pub error_clear: Duration,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            processing_delay: Duration::from_millis(3000),
            paid_display: Duration::from_millis(1200),
            failed_dismiss: Duration::from_millis(1500),
            error_clear: Duration::from_millis(2000),
        }
    }
}
