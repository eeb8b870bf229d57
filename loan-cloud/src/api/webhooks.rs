//! Shopify webhook handlers
//!
//! POST /api/webhooks/subscription — plan/status/cycle sync
//! POST /api/webhooks/customers/delete — erase a customer's data
//!
//! Both verify the HMAC over the raw body and drop repeat deliveries by
//! `X-Shopify-Webhook-Id`.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use http::HeaderMap;
use serde_json::{Value, json};
use shared::error::{AppError, ErrorCode};

use crate::db;
use crate::db::members::SubscriptionUpsert;
use crate::error::{ServiceError, ServiceResult};
use crate::shopify::{self, CustomerDeleteEvent, SubscriptionEvent, payload_invalid};
use crate::state::AppState;
use crate::validation::{MAX_SHORT_TEXT_LEN, validate_required_text};

const SUBSCRIPTION_TOPIC: &str = "subscription";
const CUSTOMER_DELETE_TOPIC: &str = "customers/delete";

/// POST /api/webhooks/subscription
pub async fn subscription(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ServiceResult<Json<Value>> {
    // 1. Signature
    verify(&state, &headers, &body)?;

    // 2. Parse and map before recording the delivery, so a bad payload can be fixed and resent
    let event: SubscriptionEvent = serde_json::from_slice(&body)
        .map_err(|e| payload_invalid(format!("Invalid subscription payload: {e}")))?;
    validate_required_text(&event.event_type, "type", MAX_SHORT_TEXT_LEN)?;
    validate_required_text(
        &event.data.shopify_customer_id,
        "shopify_customer_id",
        MAX_SHORT_TEXT_LEN,
    )?;
    validate_required_text(&event.data.card_token, "card_token", MAX_SHORT_TEXT_LEN)?;
    let resolved = event.data.resolve()?;

    // 3. Deduplicate
    let Delivery::New(delivery) = claim_delivery(&state, &headers, SUBSCRIPTION_TOPIC).await?
    else {
        return Ok(Json(json!({ "status": "duplicate" })));
    };

    // 4. Upsert and audit; an infrastructure failure releases the delivery for the sender's retry
    let now = shared::util::now_millis();
    let upsert = SubscriptionUpsert {
        shopify_customer_id: &event.data.shopify_customer_id,
        card_token: &event.data.card_token,
        tier: resolved.tier,
        status: resolved.status,
        cycle: crate::ledger::Cycle {
            start: resolved.cycle_start,
            end: resolved.cycle_end,
        },
    };
    let result = async {
        let member =
            db::members::upsert_subscription(&state.pool, &shared::util::new_id(), &upsert, now)
                .await
                .map_err(|e| db::members::write_error(e, upsert.card_token))?;
        let metadata = serde_json::to_value(&event.data).map_err(|e| ServiceError::Db(e.into()))?;
        db::audit::log(
            &state.pool,
            &member.id,
            &format!("subscription_{}", event.event_type),
            &metadata,
            now,
        )
        .await?;
        Ok::<_, ServiceError>(member)
    }
    .await;

    let member = match result {
        Ok(member) => member,
        Err(e) => {
            tracing::warn!(code = %e.code(), event_type = %event.event_type, "Subscription sync failed");
            if matches!(e, ServiceError::Db(_)) {
                release_delivery(&state, delivery.as_deref()).await;
            }
            return Err(e);
        }
    };

    tracing::info!(
        member_id = %member.id,
        event_type = %event.event_type,
        tier = %member.tier,
        "Subscription synced"
    );

    Ok(Json(json!({ "status": "ok", "member_id": member.id })))
}

/// POST /api/webhooks/customers/delete
pub async fn customers_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ServiceResult<Json<Value>> {
    verify(&state, &headers, &body)?;

    let event: CustomerDeleteEvent = serde_json::from_slice(&body)
        .map_err(|e| payload_invalid(format!("Invalid customer payload: {e}")))?;
    validate_required_text(
        &event.shopify_customer_id,
        "shopify_customer_id",
        MAX_SHORT_TEXT_LEN,
    )?;

    let Delivery::New(delivery) = claim_delivery(&state, &headers, CUSTOMER_DELETE_TOPIC).await?
    else {
        return Ok(Json(json!({ "status": "duplicate" })));
    };

    let erased = match db::members::erase_by_customer(&state.pool, &event.shopify_customer_id).await
    {
        Ok(erased) => erased,
        Err(e) => {
            release_delivery(&state, delivery.as_deref()).await;
            return Err(e.into());
        }
    };

    match &erased {
        Some(member_id) => tracing::info!(member_id = %member_id, "Customer data erased"),
        None => tracing::info!(
            shopify_customer_id = %event.shopify_customer_id,
            "Customer delete for unknown member"
        ),
    }

    Ok(Json(json!({ "status": "ok", "deleted": erased.is_some() })))
}

fn verify(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), AppError> {
    if state.shopify_webhook_secret.is_empty() {
        return Err(AppError::new(ErrorCode::WebhookSecretMissing));
    }
    let signature = headers
        .get(shopify::HMAC_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing webhook signature header");
            AppError::new(ErrorCode::WebhookSignatureInvalid)
        })?;
    shopify::verify_signature(body, signature, &state.shopify_webhook_secret).map_err(|e| {
        tracing::warn!(error = e, "Webhook signature verification failed");
        AppError::new(ErrorCode::WebhookSignatureInvalid)
    })
}

enum Delivery {
    /// First time seen; carries the recorded id, if the sender sent one
    New(Option<String>),
    Duplicate,
}

/// Record the delivery id. Deliveries without an id are always processed.
async fn claim_delivery(
    state: &AppState,
    headers: &HeaderMap,
    topic: &str,
) -> ServiceResult<Delivery> {
    let Some(event_id) = headers
        .get(shopify::WEBHOOK_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|id| !id.is_empty())
    else {
        return Ok(Delivery::New(None));
    };

    if db::webhook_events::record(&state.pool, event_id, topic, shared::util::now_millis()).await? {
        Ok(Delivery::New(Some(event_id.to_string())))
    } else {
        tracing::info!(event_id = %event_id, topic = %topic, "Duplicate webhook delivery, skipping");
        Ok(Delivery::Duplicate)
    }
}

async fn release_delivery(state: &AppState, event_id: Option<&str>) {
    let Some(event_id) = event_id else {
        return;
    };
    if let Err(e) = db::webhook_events::forget(&state.pool, event_id).await {
        tracing::error!(event_id = %event_id, error = %e, "Failed to release webhook delivery");
    }
}
