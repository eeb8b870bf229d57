//! Photo claim rows
//!
//! Claims are created before the bytes hit object storage so the id can be
//! used in the storage key; the key is filled in once the upload succeeds.

use shared::models::PhotoClaim;
use sqlx::PgPool;

use super::loans::PHOTO_COLUMNS;

pub async fn create(
    pool: &PgPool,
    id: &str,
    metadata: &serde_json::Value,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO photo_claims (id, storage_key, metadata, created_at) VALUES ($1, '', $2, $3)")
        .bind(id)
        .bind(metadata)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(())
}

/// Record where the bytes landed
pub async fn finalize(
    pool: &PgPool,
    id: &str,
    storage_key: &str,
    metadata: &serde_json::Value,
) -> Result<PhotoClaim, sqlx::Error> {
    sqlx::query_as::<_, PhotoClaim>(&format!(
        "UPDATE photo_claims SET storage_key = $2, metadata = $3 WHERE id = $1 RETURNING {PHOTO_COLUMNS}"
    ))
    .bind(id)
    .bind(storage_key)
    .bind(metadata)
    .fetch_one(pool)
    .await
}

/// Drop a claim whose upload failed
pub async fn discard(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM photo_claims WHERE id = $1 AND loan_id IS NULL")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
