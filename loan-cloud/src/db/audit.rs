//! Audit event operations
//!
//! Append-only. The ledger writes through this inside its transactions.

use sqlx::PgExecutor;

/// Write an audit event
pub async fn log<'e, E: PgExecutor<'e>>(
    executor: E,
    member_id: &str,
    action: &str,
    metadata: &serde_json::Value,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_events (member_id, action, metadata, created_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(member_id)
    .bind(action)
    .bind(metadata)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}
