//! PostgreSQL implementation of the ledger store
//!
//! Each lifecycle operation owns one `sqlx::Transaction`. `lock_member`
//! takes `SELECT ... FOR UPDATE` on the member row, which serializes all
//! checkouts, returns and swaps for that member until commit or rollback.

use async_trait::async_trait;
use shared::models::{Loan, Member, PhotoClaim};
use sqlx::{PgPool, Postgres, Transaction};

use super::loans::{LOAN_COLUMNS, PHOTO_COLUMNS};
use super::members::MEMBER_COLUMNS;
use crate::error::BoxError;
use crate::ledger::{CounterDelta, Cycle, LedgerStore, LedgerTx, NewLoan};

#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerStore for PgLedger {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> Result<PgLedgerTx, BoxError> {
        Ok(PgLedgerTx {
            tx: self.pool.begin().await?,
        })
    }

    async fn find_member(&self, member_id: &str) -> Result<Option<Member>, BoxError> {
        Ok(super::members::find_by_id(&self.pool, member_id).await?)
    }

    async fn active_loans(&self, member_id: &str) -> Result<Vec<Loan>, BoxError> {
        Ok(super::loans::find_active(&self.pool, member_id).await?)
    }

    async fn photos_for_loans(&self, loan_ids: &[String]) -> Result<Vec<PhotoClaim>, BoxError> {
        Ok(super::loans::photos_for_loans(&self.pool, loan_ids).await?)
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_member(&mut self, member_id: &str) -> Result<Option<Member>, BoxError> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1 FOR UPDATE"
        ))
        .bind(member_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(member)
    }

    async fn roll_cycle(
        &mut self,
        member_id: &str,
        cycle: Cycle,
        now: i64,
    ) -> Result<Member, BoxError> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "UPDATE members SET cycle_start = $2, cycle_end = $3, items_used = 0, swaps_used = 0, updated_at = $4
             WHERE id = $1 RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(member_id)
        .bind(cycle.start)
        .bind(cycle.end)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(member)
    }

    async fn find_loan(&mut self, loan_id: &str) -> Result<Option<Loan>, BoxError> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE id = $1 FOR UPDATE"
        ))
        .bind(loan_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(loan)
    }

    async fn find_unlinked_photos(&mut self, ids: &[String]) -> Result<Vec<PhotoClaim>, BoxError> {
        let claims = sqlx::query_as::<_, PhotoClaim>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photo_claims
             WHERE id = ANY($1) AND loan_id IS NULL AND storage_key <> ''
             FOR UPDATE"
        ))
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(claims)
    }

    async fn insert_loan(&mut self, loan: &NewLoan) -> Result<Loan, BoxError> {
        let id = shared::util::new_id();
        let row = sqlx::query_as::<_, Loan>(&format!(
            "INSERT INTO loans (id, member_id, store_location, primary_photo_id, primary_photo_key, checkout_at, due_at, returned_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, $6)
             RETURNING {LOAN_COLUMNS}"
        ))
        .bind(&id)
        .bind(&loan.member_id)
        .bind(&loan.store_location)
        .bind(&loan.primary_photo_id)
        .bind(&loan.primary_photo_key)
        .bind(loan.checkout_at)
        .bind(loan.due_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn mark_returned(&mut self, loan_id: &str, at: i64) -> Result<Loan, BoxError> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            "UPDATE loans SET returned_at = $2 WHERE id = $1 AND returned_at IS NULL RETURNING {LOAN_COLUMNS}"
        ))
        .bind(loan_id)
        .bind(at)
        .fetch_optional(&mut *self.tx)
        .await?;
        loan.ok_or_else(|| format!("loan {loan_id} was not active at return").into())
    }

    async fn link_photos(&mut self, ids: &[String], loan_id: &str) -> Result<u64, BoxError> {
        let result = sqlx::query(
            "UPDATE photo_claims SET loan_id = $2, loan_position = array_position($1, id) - 1
             WHERE id = ANY($1) AND loan_id IS NULL",
        )
        .bind(ids)
        .bind(loan_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn apply_counters(
        &mut self,
        member_id: &str,
        delta: CounterDelta,
        now: i64,
    ) -> Result<Member, BoxError> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "UPDATE members SET
                 items_used = items_used + $2,
                 swaps_used = swaps_used + $3,
                 items_out = GREATEST(items_out + $4, 0),
                 updated_at = $5
             WHERE id = $1 RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(member_id)
        .bind(delta.items_used)
        .bind(delta.swaps_used)
        .bind(delta.items_out)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(member)
    }

    async fn append_audit(
        &mut self,
        member_id: &str,
        action: &str,
        metadata: &serde_json::Value,
        now: i64,
    ) -> Result<(), BoxError> {
        super::audit::log(&mut *self.tx, member_id, action, metadata, now).await?;
        Ok(())
    }

    async fn commit(self) -> Result<(), BoxError> {
        self.tx.commit().await?;
        Ok(())
    }
}
