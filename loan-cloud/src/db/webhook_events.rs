//! Processed webhook deliveries

use sqlx::PgPool;

/// Record a delivery. Returns `false` when it was already processed.
///
/// INSERT first and check rows_affected, so two concurrent deliveries of the
/// same event cannot both pass.
pub async fn record(
    pool: &PgPool,
    event_id: &str,
    topic: &str,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO processed_webhook_events (event_id, topic, processed_at)
         VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(event_id)
    .bind(topic)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Forget a delivery so the sender's retry is processed again
pub async fn forget(pool: &PgPool, event_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM processed_webhook_events WHERE event_id = $1")
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(())
}
