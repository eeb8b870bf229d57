//! Persistence seam for the loan ledger
//!
//! The ledger only talks to storage through these traits. Every mutating
//! operation runs inside one [`LedgerTx`]; dropping a transaction without
//! calling [`LedgerTx::commit`] discards all of its writes.

use async_trait::async_trait;
use shared::models::{Loan, Member, PhotoClaim};

use super::cycle::Cycle;
use crate::error::BoxError;

/// Change applied to a member's counters in one statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterDelta {
    pub items_used: i32,
    pub swaps_used: i32,
    pub items_out: i32,
}

impl CounterDelta {
    pub const CHECKOUT: Self = Self {
        items_used: 1,
        swaps_used: 0,
        items_out: 1,
    };
    pub const RETURN: Self = Self {
        items_used: 0,
        swaps_used: 0,
        items_out: -1,
    };
    /// One item replaces another, so `items_out` stays put
    pub const SWAP: Self = Self {
        items_used: 1,
        swaps_used: 1,
        items_out: 0,
    };
}

/// Loan row about to be inserted; the store assigns the id
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub member_id: String,
    pub store_location: String,
    pub primary_photo_id: String,
    pub primary_photo_key: String,
    pub checkout_at: i64,
    pub due_at: i64,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Tx: LedgerTx;

    /// Open a transaction for one lifecycle operation
    async fn begin(&self) -> Result<Self::Tx, BoxError>;

    /// Plain read, no lock
    async fn find_member(&self, member_id: &str) -> Result<Option<Member>, BoxError>;

    /// Loans with `returned_at IS NULL`, newest checkout first
    async fn active_loans(&self, member_id: &str) -> Result<Vec<Loan>, BoxError>;

    /// Every photo claim linked to one of the given loans, in link order
    async fn photos_for_loans(&self, loan_ids: &[String]) -> Result<Vec<PhotoClaim>, BoxError>;
}

#[async_trait]
pub trait LedgerTx: Send {
    /// Load the member and hold its row until commit/rollback
    async fn lock_member(&mut self, member_id: &str) -> Result<Option<Member>, BoxError>;

    /// Persist a new cycle window and zero `items_used`/`swaps_used`
    async fn roll_cycle(
        &mut self,
        member_id: &str,
        cycle: Cycle,
        now: i64,
    ) -> Result<Member, BoxError>;

    async fn find_loan(&mut self, loan_id: &str) -> Result<Option<Loan>, BoxError>;

    /// Claims among `ids` that exist, have a storage key and are not linked
    /// to any loan yet
    async fn find_unlinked_photos(&mut self, ids: &[String]) -> Result<Vec<PhotoClaim>, BoxError>;

    async fn insert_loan(&mut self, loan: &NewLoan) -> Result<Loan, BoxError>;

    async fn mark_returned(&mut self, loan_id: &str, at: i64) -> Result<Loan, BoxError>;

    /// Link still-unlinked claims to `loan_id`, recording each claim's index
    /// in `ids`. Returns how many rows changed
    async fn link_photos(&mut self, ids: &[String], loan_id: &str) -> Result<u64, BoxError>;

    /// Apply a counter delta; `items_out` is floored at zero
    async fn apply_counters(
        &mut self,
        member_id: &str,
        delta: CounterDelta,
        now: i64,
    ) -> Result<Member, BoxError>;

    async fn append_audit(
        &mut self,
        member_id: &str,
        action: &str,
        metadata: &serde_json::Value,
        now: i64,
    ) -> Result<(), BoxError>;

    async fn commit(self) -> Result<(), BoxError>;
}
