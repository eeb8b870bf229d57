//! Loan reads outside a ledger transaction

use shared::models::{Loan, PhotoClaim};
use sqlx::PgPool;

pub const LOAN_COLUMNS: &str = "id, member_id, store_location, primary_photo_id, primary_photo_key, checkout_at, due_at, returned_at, created_at";

pub const PHOTO_COLUMNS: &str = "id, storage_key, metadata, loan_id, created_at";

/// Active loans for a member, newest checkout first
pub async fn find_active(pool: &PgPool, member_id: &str) -> Result<Vec<Loan>, sqlx::Error> {
    sqlx::query_as::<_, Loan>(&format!(
        "SELECT {LOAN_COLUMNS} FROM loans WHERE member_id = $1 AND returned_at IS NULL ORDER BY checkout_at DESC, id DESC"
    ))
    .bind(member_id)
    .fetch_all(pool)
    .await
}

/// Photo claims linked to any of the given loans, in the order they were
/// listed at checkout
pub async fn photos_for_loans(
    pool: &PgPool,
    loan_ids: &[String],
) -> Result<Vec<PhotoClaim>, sqlx::Error> {
    sqlx::query_as::<_, PhotoClaim>(&format!(
        "SELECT {PHOTO_COLUMNS} FROM photo_claims WHERE loan_id = ANY($1) ORDER BY loan_position NULLS LAST, created_at, id"
    ))
    .bind(loan_ids)
    .fetch_all(pool)
    .await
}
