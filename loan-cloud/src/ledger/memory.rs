//! In-memory ledger store for tests
//!
//! A transaction holds the whole state lock (standing in for the member row
//! lock) and works on a copy that is written back only on commit.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use shared::models::{Loan, Member, MemberStatus, PhotoClaim, Tier};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::cycle::Cycle;
use super::store::{CounterDelta, LedgerStore, LedgerTx, NewLoan};
use crate::error::BoxError;

#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub member_id: String,
    pub action: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub members: HashMap<String, Member>,
    pub loans: HashMap<String, Loan>,
    pub photos: HashMap<String, PhotoClaim>,
    /// Index of each linked claim in the request that consumed it
    pub photo_positions: HashMap<String, usize>,
    pub audit: Vec<AuditRecord>,
    /// Committed cycle roll writes
    pub cycle_writes: u32,
    /// Make `append_audit` fail, to exercise rollback after partial writes
    pub fail_audit: bool,
}

#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    pub async fn update(&self, f: impl FnOnce(&mut MemoryState)) {
        f(&mut *self.state.lock().await);
    }

    pub async fn member(&self, id: &str) -> Member {
        self.state.lock().await.members[id].clone()
    }

    pub async fn loan(&self, id: &str) -> Loan {
        self.state.lock().await.loans[id].clone()
    }

    /// Insert an active member whose cycle runs `[cycle_start, cycle_end)`
    pub async fn seed_member(&self, id: &str, tier: Tier, cycle_start: i64, cycle_end: i64) -> Member {
        let member = Member {
            id: id.to_string(),
            card_token: format!("card-{id}"),
            shopify_customer_id: None,
            tier,
            status: MemberStatus::Active,
            cycle_start,
            cycle_end,
            items_used: 0,
            swaps_used: 0,
            items_out: 0,
            created_at: cycle_start,
            updated_at: cycle_start,
        };
        self.state
            .lock()
            .await
            .members
            .insert(id.to_string(), member.clone());
        member
    }

    /// Insert a claim whose upload never finished (no storage key yet)
    pub async fn seed_pending_photo(&self, id: &str) {
        let claim = PhotoClaim {
            id: id.to_string(),
            storage_key: String::new(),
            metadata: serde_json::json!({}),
            loan_id: None,
            created_at: 0,
        };
        self.state
            .lock()
            .await
            .photos
            .insert(id.to_string(), claim);
    }

    pub async fn seed_photo(&self, id: &str) {
        let claim = PhotoClaim {
            id: id.to_string(),
            storage_key: format!("loans/test/{id}.jpg"),
            metadata: serde_json::json!({ "mime_type": "image/jpeg" }),
            loan_id: None,
            created_at: 0,
        };
        self.state
            .lock()
            .await
            .photos
            .insert(id.to_string(), claim);
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    next_id: Arc<AtomicU64>,
}

impl MemoryTx {
    fn member_mut(&mut self, member_id: &str) -> Result<&mut Member, BoxError> {
        self.working
            .members
            .get_mut(member_id)
            .ok_or_else(|| format!("member {member_id} vanished").into())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, BoxError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx {
            guard,
            working,
            next_id: self.next_id.clone(),
        })
    }

    async fn find_member(&self, member_id: &str) -> Result<Option<Member>, BoxError> {
        Ok(self.state.lock().await.members.get(member_id).cloned())
    }

    async fn active_loans(&self, member_id: &str) -> Result<Vec<Loan>, BoxError> {
        let state = self.state.lock().await;
        let mut loans: Vec<Loan> = state
            .loans
            .values()
            .filter(|l| l.member_id == member_id && l.returned_at.is_none())
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.checkout_at.cmp(&a.checkout_at).then(b.id.cmp(&a.id)));
        Ok(loans)
    }

    async fn photos_for_loans(&self, loan_ids: &[String]) -> Result<Vec<PhotoClaim>, BoxError> {
        let state = self.state.lock().await;
        let mut claims: Vec<PhotoClaim> = state
            .photos
            .values()
            .filter(|p| p.loan_id.as_ref().is_some_and(|id| loan_ids.contains(id)))
            .cloned()
            .collect();
        claims.sort_by_key(|p| {
            (
                state.photo_positions.get(&p.id).copied().unwrap_or(usize::MAX),
                p.created_at,
                p.id.clone(),
            )
        });
        Ok(claims)
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn lock_member(&mut self, member_id: &str) -> Result<Option<Member>, BoxError> {
        Ok(self.working.members.get(member_id).cloned())
    }

    async fn roll_cycle(&mut self, member_id: &str, cycle: Cycle, now: i64) -> Result<Member, BoxError> {
        self.working.cycle_writes += 1;
        let member = self.member_mut(member_id)?;
        member.cycle_start = cycle.start;
        member.cycle_end = cycle.end;
        member.items_used = 0;
        member.swaps_used = 0;
        member.updated_at = now;
        Ok(member.clone())
    }

    async fn find_loan(&mut self, loan_id: &str) -> Result<Option<Loan>, BoxError> {
        Ok(self.working.loans.get(loan_id).cloned())
    }

    async fn find_unlinked_photos(&mut self, ids: &[String]) -> Result<Vec<PhotoClaim>, BoxError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.working.photos.get(id))
            .filter(|p| p.loan_id.is_none() && !p.storage_key.is_empty())
            .cloned()
            .collect())
    }

    async fn insert_loan(&mut self, loan: &NewLoan) -> Result<Loan, BoxError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let row = Loan {
            id: format!("loan-{n}"),
            member_id: loan.member_id.clone(),
            store_location: loan.store_location.clone(),
            primary_photo_id: loan.primary_photo_id.clone(),
            primary_photo_key: loan.primary_photo_key.clone(),
            checkout_at: loan.checkout_at,
            due_at: loan.due_at,
            returned_at: None,
            created_at: loan.checkout_at,
        };
        self.working.loans.insert(row.id.clone(), row.clone());
        Ok(row)
    }

    async fn mark_returned(&mut self, loan_id: &str, at: i64) -> Result<Loan, BoxError> {
        let loan = self
            .working
            .loans
            .get_mut(loan_id)
            .filter(|loan| loan.returned_at.is_none())
            .ok_or_else(|| format!("loan {loan_id} was not active at return"))?;
        loan.returned_at = Some(at);
        Ok(loan.clone())
    }

    async fn link_photos(&mut self, ids: &[String], loan_id: &str) -> Result<u64, BoxError> {
        let mut linked = 0;
        for (position, id) in ids.iter().enumerate() {
            if let Some(photo) = self.working.photos.get_mut(id)
                && photo.loan_id.is_none()
            {
                photo.loan_id = Some(loan_id.to_string());
                self.working.photo_positions.insert(id.clone(), position);
                linked += 1;
            }
        }
        Ok(linked)
    }

    async fn apply_counters(
        &mut self,
        member_id: &str,
        delta: CounterDelta,
        now: i64,
    ) -> Result<Member, BoxError> {
        let member = self.member_mut(member_id)?;
        member.items_used += delta.items_used;
        member.swaps_used += delta.swaps_used;
        member.items_out = (member.items_out + delta.items_out).max(0);
        member.updated_at = now;
        Ok(member.clone())
    }

    async fn append_audit(
        &mut self,
        member_id: &str,
        action: &str,
        metadata: &serde_json::Value,
        _now: i64,
    ) -> Result<(), BoxError> {
        if self.working.fail_audit {
            return Err("audit sink unavailable".into());
        }
        self.working.audit.push(AuditRecord {
            member_id: member_id.to_string(),
            action: action.to_string(),
            metadata: metadata.clone(),
        });
        Ok(())
    }

    async fn commit(mut self) -> Result<(), BoxError> {
        *self.guard = self.working;
        Ok(())
    }
}
