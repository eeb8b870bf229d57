//! Member Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Membership tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "member_tier", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum Tier {
    Basic,
    Plus,
    Premium,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Basic => "BASIC",
            Tier::Plus => "PLUS",
            Tier::Premium => "PREMIUM",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "member_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum MemberStatus {
    Active,
    Paused,
    Cancelled,
}

impl MemberStatus {
    /// Parse an upstream status string (any case). Unknown values map to `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Some(Self::Active),
            "PAUSED" => Some(Self::Paused),
            "CANCELLED" | "CANCELED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Member entity
///
/// `items_used`/`swaps_used` count usage inside the current cycle window,
/// `items_out` counts loans not yet returned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Member {
    pub id: String,
    pub card_token: String,
    pub shopify_customer_id: Option<String>,
    pub tier: Tier,
    pub status: MemberStatus,
    pub cycle_start: i64,
    pub cycle_end: i64,
    pub items_used: i32,
    pub swaps_used: i32,
    pub items_out: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Enroll member payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberCreate {
    #[serde(alias = "cardToken")]
    pub card_token: String,
    #[serde(default, alias = "shopifyCustomerId")]
    pub shopify_customer_id: Option<String>,
    pub tier: Tier,
    /// Defaults to `ACTIVE`
    pub status: Option<MemberStatus>,
}

/// Remaining quota for the current cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Allowances {
    pub tier: Tier,
    pub items_per_month: i32,
    pub items_used: i32,
    pub items_remaining: i32,
    pub swaps_per_month: i32,
    pub swaps_used: i32,
    pub swaps_remaining: i32,
    pub max_items_out: i32,
    pub items_out: i32,
    pub cycle_end: i64,
}

/// Member lookup response (card scan at the counter)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberOverview {
    pub member: Member,
    pub allowances: Allowances,
    pub active_loans: Vec<super::LoanSummary>,
}
