//! TapPay Wallet Core - mock tap-to-pay payment engine
//!
//! This library simulates tap-to-pay transactions against a prioritized,
//! user-reorderable list of funding sources. It provides deterministic
//! funding-source selection, a simulated asynchronous settlement lifecycle,
//! a pending-transaction watcher for blockchain-style deposits, and an
//! identity-verification polling protocol gating restricted sources.

pub mod error;
pub mod ledger;
pub mod payment;
pub mod verification;

// Re-export commonly used types for convenience
pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
