//! Error types for the wallet engine

use rust_decimal::Decimal;
use thiserror::Error;

/// Custom error type for wallet engine operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Insufficient funds: no eligible funding source covers {0}")]
    InsufficientFunds(Decimal),

    #[error("A charge is already being processed")]
    ChargeInProgress,

    #[error("Funding source not found: {0}")]
    SourceNotFound(String),

    #[error("Funding source {0} already has a pending transaction")]
    PendingTransactionExists(String),

    #[error("Funding source {0} has no pending transaction")]
    NoPendingTransaction(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    #[error("Reorder index out of bounds: {0}")]
    InvalidIndex(usize),

    #[error("Failed to register the session id on the server: {0}")]
    RegistrationFailed(String),

    #[error("Passport verification timeout")]
    VerificationTimeout,

    #[error("Network error: {0}")]
    Network(String),
}

/// Result type for wallet engine operations
pub type Result<T> = std::result::Result<T, Error>;
