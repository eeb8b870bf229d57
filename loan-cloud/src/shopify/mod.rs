//! Shopify webhook helpers
//!
//! Signature verification, plan mapping and payload types for the
//! subscription and customer-erasure webhooks.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::DateTime;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use sha2::Sha256;
use shared::models::{MemberStatus, Tier};

pub const HMAC_HEADER: &str = "x-shopify-hmac-sha256";
pub const WEBHOOK_ID_HEADER: &str = "x-shopify-webhook-id";

/// Verify `X-Shopify-Hmac-Sha256`: base64(HMAC-SHA256(secret, raw body)).
///
/// Comparison goes through `verify_slice`, which is constant time.
pub fn verify_signature(payload: &[u8], signature: &str, secret: &str) -> Result<(), &'static str> {
    if secret.is_empty() {
        return Err("Webhook secret not configured");
    }
    let expected = STANDARD
        .decode(signature.trim())
        .map_err(|_| "Invalid signature encoding")?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| "Webhook signature mismatch")
}

/// Map a plan handle (`basic`/`plus`/`premium`, any case) to a tier
pub fn plan_tier(handle: &str) -> Option<Tier> {
    match handle.trim().to_ascii_lowercase().as_str() {
        "basic" => Some(Tier::Basic),
        "plus" => Some(Tier::Plus),
        "premium" => Some(Tier::Premium),
        _ => None,
    }
}

/// Either epoch milliseconds or an RFC 3339 string
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    Text(String),
}

impl Timestamp {
    pub fn to_millis(&self) -> Option<i64> {
        match self {
            Timestamp::Millis(ms) => Some(*ms),
            Timestamp::Text(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.timestamp_millis()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionEvent {
    /// `created`, `updated`, `paused`, `cancelled`, ...
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: SubscriptionData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionData {
    #[serde(alias = "shopifyCustomerId")]
    pub shopify_customer_id: String,
    #[serde(alias = "cardToken")]
    pub card_token: String,
    #[serde(alias = "planHandle")]
    pub plan_handle: String,
    pub status: String,
    #[serde(alias = "cycleStart")]
    pub cycle_start: Timestamp,
    #[serde(alias = "cycleEnd")]
    pub cycle_end: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDeleteEvent {
    #[serde(alias = "shopifyCustomerId")]
    pub shopify_customer_id: String,
}

/// Subscription data after mapping to ledger types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionState {
    pub tier: Tier,
    pub status: MemberStatus,
    pub cycle_start: i64,
    pub cycle_end: i64,
}

impl SubscriptionData {
    /// Map plan, status and cycle window onto ledger types.
    pub fn resolve(&self) -> Result<SubscriptionState, AppError> {
        let tier = plan_tier(&self.plan_handle).ok_or_else(|| {
            AppError::with_message(
                ErrorCode::UnsupportedPlan,
                format!("Unsupported plan handle: {}", self.plan_handle),
            )
            .with_detail("plan_handle", self.plan_handle.as_str())
        })?;
        let status = MemberStatus::parse(&self.status).ok_or_else(|| {
            payload_invalid(format!("Unsupported subscription status: {}", self.status))
        })?;
        let cycle_start = self
            .cycle_start
            .to_millis()
            .ok_or_else(|| payload_invalid("Invalid cycle_start"))?;
        let cycle_end = self
            .cycle_end
            .to_millis()
            .ok_or_else(|| payload_invalid("Invalid cycle_end"))?;
        if cycle_end <= cycle_start {
            return Err(payload_invalid("cycle_end must be after cycle_start"));
        }
        Ok(SubscriptionState {
            tier,
            status,
            cycle_start,
            cycle_end,
        })
    }
}

pub fn payload_invalid(msg: impl Into<String>) -> AppError {
    AppError::with_message(ErrorCode::WebhookPayloadInvalid, msg)
}
