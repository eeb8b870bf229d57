//! Member enrollment, lookup, subscription sync and erasure
//!
//! Counters are never written here; only the ledger mutates them.

use shared::error::{AppError, ErrorCode};
use shared::models::{Member, MemberCreate, MemberStatus, Tier};
use sqlx::PgPool;

use crate::error::{BoxError, ServiceError};
use crate::ledger::Cycle;

pub const MEMBER_COLUMNS: &str = "id, card_token, shopify_customer_id, tier, status, cycle_start, cycle_end, items_used, swaps_used, items_out, created_at, updated_at";

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(&format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_card(pool: &PgPool, card_token: &str) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM members WHERE card_token = $1"
    ))
    .bind(card_token)
    .fetch_optional(pool)
    .await
}

/// Insert a new member with zeroed counters.
///
/// A taken card token or customer id surfaces as a unique violation.
pub async fn create(
    pool: &PgPool,
    id: &str,
    data: &MemberCreate,
    cycle: Cycle,
    now: i64,
) -> Result<Member, sqlx::Error> {
    sqlx::query_as::<_, Member>(&format!(
        "INSERT INTO members (id, card_token, shopify_customer_id, tier, status, cycle_start, cycle_end, items_used, swaps_used, items_out, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, 0, 0, 0, $8, $8)
         RETURNING {MEMBER_COLUMNS}"
    ))
    .bind(id)
    .bind(&data.card_token)
    .bind(&data.shopify_customer_id)
    .bind(data.tier)
    .bind(data.status.unwrap_or(MemberStatus::Active))
    .bind(cycle.start)
    .bind(cycle.end)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Map a write error from [`create`] or [`upsert_subscription`]. A unique
/// violation means the card token (or customer id) already belongs to
/// another member.
pub fn write_error(err: sqlx::Error, card_token: &str) -> ServiceError {
    match err {
        sqlx::Error::Database(e) if e.is_unique_violation() => {
            AppError::new(ErrorCode::MemberAlreadyExists)
                .with_detail("card_token", card_token)
                .into()
        }
        e => e.into(),
    }
}

/// Subscription state pushed by the commerce platform
#[derive(Debug, Clone)]
pub struct SubscriptionUpsert<'a> {
    pub shopify_customer_id: &'a str,
    pub card_token: &'a str,
    pub tier: Tier,
    pub status: MemberStatus,
    pub cycle: Cycle,
}

/// Create or update the member owning `shopify_customer_id`.
///
/// Updates touch plan, status, cycle window and card token only.
pub async fn upsert_subscription(
    pool: &PgPool,
    new_id: &str,
    sub: &SubscriptionUpsert<'_>,
    now: i64,
) -> Result<Member, sqlx::Error> {
    sqlx::query_as::<_, Member>(&format!(
        "INSERT INTO members (id, card_token, shopify_customer_id, tier, status, cycle_start, cycle_end, items_used, swaps_used, items_out, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, 0, 0, 0, $8, $8)
         ON CONFLICT (shopify_customer_id) DO UPDATE SET
             card_token = EXCLUDED.card_token,
             tier = EXCLUDED.tier,
             status = EXCLUDED.status,
             cycle_start = EXCLUDED.cycle_start,
             cycle_end = EXCLUDED.cycle_end,
             updated_at = EXCLUDED.updated_at
         RETURNING {MEMBER_COLUMNS}"
    ))
    .bind(new_id)
    .bind(sub.card_token)
    .bind(sub.shopify_customer_id)
    .bind(sub.tier)
    .bind(sub.status)
    .bind(sub.cycle.start)
    .bind(sub.cycle.end)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Remove every row belonging to the member with this customer id.
///
/// Returns the erased member id, or `None` when no member matched.
pub async fn erase_by_customer(
    pool: &PgPool,
    shopify_customer_id: &str,
) -> Result<Option<String>, BoxError> {
    let mut tx = pool.begin().await?;

    let member_id: Option<String> = sqlx::query_scalar(
        "SELECT id FROM members WHERE shopify_customer_id = $1 FOR UPDATE",
    )
    .bind(shopify_customer_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(member_id) = member_id else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM audit_events WHERE member_id = $1")
        .bind(&member_id)
        .execute(&mut *tx)
        .await?;
    // Unlinked uploads are only tied to the member through their metadata
    sqlx::query("DELETE FROM photo_claims WHERE loan_id IS NULL AND metadata->>'member_id' = $1")
        .bind(&member_id)
        .execute(&mut *tx)
        .await?;
    // Loans and their linked claims cascade
    sqlx::query("DELETE FROM members WHERE id = $1")
        .bind(&member_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(member_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use sqlx::error::{DatabaseError, ErrorKind};

    #[derive(Debug)]
    /// Database error that is a unique violation when the flag is set
    struct FakeDbError(bool);

    impl std::fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "duplicate key value violates unique constraint")
        }
    }

    impl std::error::Error for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23505"))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> BoxError {
            self
        }

        fn kind(&self) -> ErrorKind {
            if self.0 {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::Other
            }
        }
    }

    #[test]
    fn test_taken_card_token_is_a_conflict() {
        let err = sqlx::Error::Database(Box::new(FakeDbError(true)));
        let mapped = write_error(err, "card-7");
        assert_eq!(mapped.code(), ErrorCode::MemberAlreadyExists);
        assert_eq!(
            mapped.app().unwrap().detail("card_token").unwrap(),
            "card-7"
        );
        assert_eq!(
            AppError::from(mapped).http_status(),
            http::StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_other_write_errors_stay_internal() {
        let err = sqlx::Error::Database(Box::new(FakeDbError(false)));
        assert!(matches!(write_error(err, "card-7"), ServiceError::Db(_)));
        assert!(matches!(
            write_error(sqlx::Error::RowNotFound, "card-7"),
            ServiceError::Db(_)
        ));
    }
}
