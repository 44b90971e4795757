//! Funding source ledger and reorder engine
//!
//! The ledger owns the ordered list of funding sources and is the only
//! mutation path for balances, priorities and pending-transaction slots.
//! Writers replace the whole list under a single lock, so a concurrent
//! reader never observes a half-applied update.

mod defaults;

pub use defaults::default_funding_sources;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};

/// An outstanding value-transfer awaiting external confirmation.
///
/// While a pending transaction is live the source's balance is frozen for
/// deposits: a second pending transaction cannot be registered and the
/// settlement engine will not select the source for a charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    /// Amount credited to the funding source on confirmation
    pub amount: Decimal,
    /// Opaque external transaction identifier (e.g. a hash string)
    pub transaction_reference: String,
    pub registered_at: DateTime<Utc>,
}

/// One funding source / payment method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingSource {
    /// Unique stable identifier, never reused
    pub id: String,
    /// Display label
    pub name: String,
    /// Selection rank, 1 = first tried; dense permutation of 1..=N
    pub priority: u32,
    /// Non-negative balance in the reference currency
    pub balance: Decimal,
    /// Usable only when the wallet owner is identity-verified
    pub requires_verification: bool,
    /// Linked provider account; a source with no linked account is never
    /// eligible for selection
    pub account_ref: Option<Uuid>,
    pub pending_transaction: Option<PendingTransaction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FundingSource {
    /// Create a new funding source with a linked provider account
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        priority: u32,
        balance: Decimal,
        requires_verification: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            priority,
            balance,
            requires_verification,
            account_ref: Some(Uuid::new_v4()),
            pending_transaction: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Detach the linked provider account
    pub fn unlinked(mut self) -> Self {
        self.account_ref = None;
        self
    }

    /// Check if the source has a linked provider account
    pub fn is_linked(&self) -> bool {
        self.account_ref.is_some()
    }

    /// Check if the source has a live pending transaction
    pub fn has_pending_transaction(&self) -> bool {
        self.pending_transaction.is_some()
    }

    /// Whether this source can settle a charge of `amount` given the
    /// wallet owner's verification state
    pub fn can_fund(&self, amount: Decimal, verified: bool) -> bool {
        self.is_linked()
            && self.pending_transaction.is_none()
            && (verified || !self.requires_verification)
            && self.balance >= amount
    }
}

/// Move the element at `from_index` to `to_index` and renumber priorities.
///
/// Pure splice-and-reinsert over the priority-ordered sequence; priorities
/// come out as `index + 1`, so the 1..=N invariant holds for any valid pair
/// of indices. Idempotent when `from_index == to_index`. Never consults
/// balances or verification state: disabled items stay reorderable.
pub fn reorder(
    list: &[FundingSource],
    from_index: usize,
    to_index: usize,
) -> Result<Vec<FundingSource>> {
    if from_index >= list.len() {
        return Err(Error::InvalidIndex(from_index));
    }
    if to_index >= list.len() {
        return Err(Error::InvalidIndex(to_index));
    }

    let mut next = list.to_vec();
    let moved = next.remove(from_index);
    next.insert(to_index, moved);

    for (idx, source) in next.iter_mut().enumerate() {
        source.priority = idx as u32 + 1;
    }

    Ok(next)
}

/// Owner of the funding source list.
///
/// All mutation is funneled through this type; callers get snapshots, never
/// shared handles to the underlying list.
#[derive(Debug, Default)]
pub struct Ledger {
    sources: RwLock<Vec<FundingSource>>,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger seeded with the given sources, ordered by priority
    pub fn with_sources(mut sources: Vec<FundingSource>) -> Self {
        sources.sort_by_key(|source| source.priority);
        Self {
            sources: RwLock::new(sources),
        }
    }

    /// Snapshot of all funding sources in ascending priority order
    pub async fn list_ordered_by_priority(&self) -> Vec<FundingSource> {
        self.sources.read().await.clone()
    }

    /// Snapshot of a single funding source
    pub async fn get(&self, id: &str) -> Option<FundingSource> {
        self.sources
            .read()
            .await
            .iter()
            .find(|source| source.id == id)
            .cloned()
    }

    /// Sum of all balances; pending amounts are excluded until confirmed
    pub async fn total_balance(&self) -> Decimal {
        self.sources
            .read()
            .await
            .iter()
            .map(|source| source.balance)
            .sum()
    }

    /// Ids of sources unusable in the current verification state, i.e.
    /// gated while unverified or missing a linked account
    pub async fn disabled_source_ids(&self, verified: bool) -> Vec<String> {
        self.sources
            .read()
            .await
            .iter()
            .filter(|source| !source.is_linked() || (source.requires_verification && !verified))
            .map(|source| source.id.clone())
            .collect()
    }

    /// Replace the balance of the source with matching `id`
    pub async fn set_balance(&self, id: &str, new_balance: Decimal) -> Result<()> {
        if new_balance.is_sign_negative() {
            return Err(Error::InvalidAmount(new_balance));
        }

        let mut sources = self.sources.write().await;
        let mut next = sources.clone();
        let source = next
            .iter_mut()
            .find(|source| source.id == id)
            .ok_or_else(|| Error::SourceNotFound(id.to_string()))?;
        source.balance = new_balance;
        source.updated_at = Utc::now();
        *sources = next;
        Ok(())
    }

    /// Register a pending deposit on a funding source.
    ///
    /// At most one pending transaction may be live per source; a second
    /// registration fails and leaves the existing one untouched.
    pub async fn register_pending_transaction(
        &self,
        id: &str,
        amount: Decimal,
        transaction_reference: impl Into<String>,
    ) -> Result<()> {
        if amount.is_sign_negative() {
            return Err(Error::InvalidAmount(amount));
        }

        let mut sources = self.sources.write().await;
        let mut next = sources.clone();
        let source = next
            .iter_mut()
            .find(|source| source.id == id)
            .ok_or_else(|| Error::SourceNotFound(id.to_string()))?;
        if source.pending_transaction.is_some() {
            return Err(Error::PendingTransactionExists(id.to_string()));
        }
        source.pending_transaction = Some(PendingTransaction {
            amount,
            transaction_reference: transaction_reference.into(),
            registered_at: Utc::now(),
        });
        source.updated_at = Utc::now();
        *sources = next;
        Ok(())
    }

    /// Atomically clear a source's pending transaction and credit its amount.
    ///
    /// Returns the credited amount.
    pub async fn clear_pending_transaction(&self, id: &str) -> Result<Decimal> {
        let mut sources = self.sources.write().await;
        let mut next = sources.clone();
        let source = next
            .iter_mut()
            .find(|source| source.id == id)
            .ok_or_else(|| Error::SourceNotFound(id.to_string()))?;
        let pending = source
            .pending_transaction
            .take()
            .ok_or_else(|| Error::NoPendingTransaction(id.to_string()))?;
        source.balance += pending.amount;
        source.updated_at = Utc::now();
        *sources = next;

        debug!(source_id = id, credited = %pending.amount, "pending transaction cleared");
        Ok(pending.amount)
    }

    /// Apply the reorder engine to the ledger's list under the write lock
    pub async fn reorder(&self, from_index: usize, to_index: usize) -> Result<Vec<FundingSource>> {
        let mut sources = self.sources.write().await;
        let next = reorder(&sources, from_index, to_index)?;
        *sources = next.clone();
        Ok(next)
    }

    /// Replace the entire list, e.g. when seeding a fresh wallet
    pub async fn replace_all(&self, mut sources: Vec<FundingSource>) {
        sources.sort_by_key(|source| source.priority);
        *self.sources.write().await = sources;
    }
}
