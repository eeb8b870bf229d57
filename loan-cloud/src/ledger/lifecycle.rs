//! Loan lifecycle: checkout, return, swap
//!
//! Each operation runs in a single store transaction:
//! lock member → roll cycle → guard → mutate → audit → commit.
//! Any error drops the transaction before commit, so nothing is persisted.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use shared::error::{AppError, ErrorCode};
use shared::models::{Loan, LoanDetail, Member, PhotoClaim, SwapOutcome};

use super::allowance;
use super::cycle::{DAY_MS, roll_cycle_if_expired};
use super::policy::TierPolicyTable;
use super::store::{CounterDelta, LedgerStore, LedgerTx, NewLoan};
use crate::error::{ServiceError, ServiceResult};
use crate::validation::{
    MAX_ID_LEN, MAX_LOCATION_LEN, validate_photo_ids, validate_required_text,
};

/// Fixed loan period
pub const LOAN_DURATION_MS: i64 = 30 * DAY_MS;

/// Time source, injectable for tests
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        shared::util::now_millis()
    }
}

pub struct LoanLedger<S> {
    store: S,
    policies: TierPolicyTable,
    clock: Arc<dyn Clock>,
}

impl<S: LedgerStore> LoanLedger<S> {
    pub fn new(store: S, policies: TierPolicyTable) -> Self {
        Self {
            store,
            policies,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policies(&self) -> &TierPolicyTable {
        &self.policies
    }

    /// Check out one item photographed by `photo_ids` (first id is the primary photo).
    pub async fn checkout(
        &self,
        member_id: &str,
        store_location: &str,
        photo_ids: &[String],
    ) -> ServiceResult<LoanDetail> {
        validate_required_text(member_id, "member_id", MAX_ID_LEN)?;
        validate_required_text(store_location, "store_location", MAX_LOCATION_LEN)?;
        validate_photo_ids(photo_ids)?;

        let now = self.clock.now_millis();
        let mut tx = self.store.begin().await?;

        // 1. Lock member and bring the cycle up to date
        let member = lock_and_roll(&mut tx, member_id, now).await?;

        // 2. Allowance guard
        allowance::ensure_can_checkout(&member, &self.policies.policy(member.tier))?;

        // 3. Resolve every photo claim or none
        let claims = resolve_claims(&mut tx, photo_ids).await?;

        // 4. Create the loan with the first claim as primary photo
        let loan = tx
            .insert_loan(&new_loan(member_id, store_location, &claims, now)?)
            .await?;

        // 5. Consume the claims
        let claims = consume_claims(&mut tx, claims, &loan.id).await?;

        // 6. One checkout = one item, regardless of photo count
        let member = tx
            .apply_counters(member_id, CounterDelta::CHECKOUT, now)
            .await?;

        // 7. Audit
        tx.append_audit(
            member_id,
            "loan_checkout",
            &json!({ "loan_id": loan.id, "photo_ids": photo_ids, "store_location": store_location }),
            now,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            member_id = %member_id,
            loan_id = %loan.id,
            items_used = member.items_used,
            items_out = member.items_out,
            "Loan checked out"
        );

        Ok(detail_from(loan, claims))
    }

    /// Hand back an active loan.
    ///
    /// Paused or cancelled members may still return items.
    pub async fn return_loan(&self, member_id: &str, loan_id: &str) -> ServiceResult<Loan> {
        validate_required_text(member_id, "member_id", MAX_ID_LEN)?;
        validate_required_text(loan_id, "loan_id", MAX_ID_LEN)?;

        let now = self.clock.now_millis();
        let mut tx = self.store.begin().await?;

        // 1. Lock member and bring the cycle up to date
        let member = lock_and_roll(&mut tx, member_id, now).await?;

        // 2. Loan must exist, belong to the member and still be out
        load_returnable_loan(&mut tx, &member, loan_id).await?;

        // 3. Close the loan
        let loan = tx.mark_returned(loan_id, now).await?;

        // 4. Counters
        let member = tx.apply_counters(member_id, CounterDelta::RETURN, now).await?;

        // 5. Audit
        tx.append_audit(member_id, "loan_return", &json!({ "loan_id": loan.id }), now)
            .await?;

        tx.commit().await?;

        tracing::info!(
            member_id = %member_id,
            loan_id = %loan.id,
            items_out = member.items_out,
            "Loan returned"
        );

        Ok(loan)
    }

    /// Return `loan_id` and check out a replacement in one step.
    ///
    /// Counts against both the swap and the monthly item allowance; `items_out`
    /// does not change.
    pub async fn swap(
        &self,
        member_id: &str,
        loan_id: &str,
        store_location: &str,
        photo_ids: &[String],
    ) -> ServiceResult<SwapOutcome> {
        validate_required_text(member_id, "member_id", MAX_ID_LEN)?;
        validate_required_text(loan_id, "loan_id", MAX_ID_LEN)?;
        validate_required_text(store_location, "store_location", MAX_LOCATION_LEN)?;
        validate_photo_ids(photo_ids)?;

        let now = self.clock.now_millis();
        let mut tx = self.store.begin().await?;

        // 1. Lock member and bring the cycle up to date
        let member = lock_and_roll(&mut tx, member_id, now).await?;

        // 2. Swap guard
        allowance::ensure_can_swap(&member, &self.policies.policy(member.tier))?;

        // 3. Same ownership checks as a plain return
        load_returnable_loan(&mut tx, &member, loan_id).await?;

        // 4. Old loan closes at the instant the new one opens
        let returned_loan = tx.mark_returned(loan_id, now).await?;

        // 5. Resolve and consume the new photos
        let claims = resolve_claims(&mut tx, photo_ids).await?;
        let new_loan = tx
            .insert_loan(&new_loan(member_id, store_location, &claims, now)?)
            .await?;
        let claims = consume_claims(&mut tx, claims, &new_loan.id).await?;

        // 6. Counters
        let member = tx.apply_counters(member_id, CounterDelta::SWAP, now).await?;

        // 7. Audit
        tx.append_audit(
            member_id,
            "loan_swap",
            &json!({
                "old_loan_id": returned_loan.id,
                "new_loan_id": new_loan.id,
                "photo_ids": photo_ids,
            }),
            now,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            member_id = %member_id,
            old_loan_id = %returned_loan.id,
            new_loan_id = %new_loan.id,
            swaps_used = member.swaps_used,
            items_used = member.items_used,
            "Loan swapped"
        );

        Ok(SwapOutcome {
            returned_loan,
            new_loan: detail_from(new_loan, claims),
        })
    }

    /// Loans still out, newest checkout first, each with its gallery.
    pub async fn active_loans(&self, member_id: &str) -> ServiceResult<Vec<LoanDetail>> {
        validate_required_text(member_id, "member_id", MAX_ID_LEN)?;

        if self.store.find_member(member_id).await?.is_none() {
            return Err(AppError::member_not_found(member_id).into());
        }

        let loans = self.store.active_loans(member_id).await?;
        if loans.is_empty() {
            return Ok(Vec::new());
        }

        let loan_ids: Vec<String> = loans.iter().map(|l| l.id.clone()).collect();
        let mut photos_by_loan: HashMap<String, Vec<PhotoClaim>> = HashMap::new();
        for claim in self.store.photos_for_loans(&loan_ids).await? {
            if let Some(loan_id) = claim.loan_id.clone() {
                photos_by_loan.entry(loan_id).or_default().push(claim);
            }
        }

        Ok(loans
            .into_iter()
            .map(|loan| {
                let claims = photos_by_loan.remove(&loan.id).unwrap_or_default();
                detail_from(loan, claims)
            })
            .collect())
    }
}

async fn lock_and_roll<T: LedgerTx>(tx: &mut T, member_id: &str, now: i64) -> ServiceResult<Member> {
    let member = tx
        .lock_member(member_id)
        .await?
        .ok_or_else(|| AppError::member_not_found(member_id))?;
    Ok(roll_cycle_if_expired(tx, member, now).await?)
}

async fn load_returnable_loan<T: LedgerTx>(
    tx: &mut T,
    member: &Member,
    loan_id: &str,
) -> ServiceResult<Loan> {
    let loan = tx
        .find_loan(loan_id)
        .await?
        .ok_or_else(|| AppError::loan_not_found(loan_id))?;

    if loan.member_id != member.id {
        return Err(AppError::new(ErrorCode::LoanNotOwned)
            .with_detail("loan_id", loan_id)
            .into());
    }
    if loan.returned_at.is_some() {
        return Err(AppError::new(ErrorCode::LoanAlreadyReturned)
            .with_detail("loan_id", loan_id)
            .into());
    }
    Ok(loan)
}

/// Fetch the requested claims in request order, failing with every id that
/// is unknown or already consumed.
async fn resolve_claims<T: LedgerTx>(tx: &mut T, ids: &[String]) -> ServiceResult<Vec<PhotoClaim>> {
    let mut found: HashMap<String, PhotoClaim> = tx
        .find_unlinked_photos(ids)
        .await?
        .into_iter()
        .map(|claim| (claim.id.clone(), claim))
        .collect();

    let mut claims = Vec::with_capacity(ids.len());
    let mut missing = Vec::new();
    for id in ids {
        match found.remove(id) {
            Some(claim) => claims.push(claim),
            None => missing.push(id.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(invalid_claims(missing).into());
    }
    Ok(claims)
}

/// Link claims to `loan_id`. A claim consumed by a concurrent transaction
/// between resolve and link aborts the operation.
async fn consume_claims<T: LedgerTx>(
    tx: &mut T,
    mut claims: Vec<PhotoClaim>,
    loan_id: &str,
) -> ServiceResult<Vec<PhotoClaim>> {
    let ids: Vec<String> = claims.iter().map(|c| c.id.clone()).collect();
    let linked = tx.link_photos(&ids, loan_id).await?;
    if linked != ids.len() as u64 {
        return Err(invalid_claims(ids).into());
    }
    for claim in &mut claims {
        claim.loan_id = Some(loan_id.to_string());
    }
    Ok(claims)
}

fn invalid_claims(missing: Vec<String>) -> AppError {
    AppError::with_message(
        ErrorCode::PhotoClaimInvalid,
        format!("Invalid upload reference: {}", missing.join(", ")),
    )
    .with_detail("missing_ids", missing)
}

fn new_loan(
    member_id: &str,
    store_location: &str,
    claims: &[PhotoClaim],
    now: i64,
) -> Result<NewLoan, ServiceError> {
    let primary = claims
        .first()
        .ok_or_else(|| AppError::with_message(ErrorCode::RequiredField, "At least one photo is required"))?;
    Ok(NewLoan {
        member_id: member_id.to_string(),
        store_location: store_location.to_string(),
        primary_photo_id: primary.id.clone(),
        primary_photo_key: primary.storage_key.clone(),
        checkout_at: now,
        due_at: now + LOAN_DURATION_MS,
    })
}

/// Everything linked to the loan except its primary photo
fn detail_from(loan: Loan, claims: Vec<PhotoClaim>) -> LoanDetail {
    let gallery = claims
        .into_iter()
        .filter(|c| c.id != loan.primary_photo_id)
        .collect();
    LoanDetail { loan, gallery }
}
