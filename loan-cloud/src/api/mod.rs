//! API routes for loan-cloud

pub mod health;
pub mod loans;
pub mod members;
pub mod uploads;
pub mod webhooks;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::idempotency::idempotency_middleware;
use crate::state::AppState;

/// Multipart bodies carry one photo plus a few form fields
const UPLOAD_BODY_LIMIT: usize = crate::storage::MAX_PHOTO_BYTES + 64 * 1024;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Counter-side member lookups and enrollment
    let members = Router::new()
        .route("/api/members", post(members::enroll))
        .route("/api/members/by-card/{card_token}", get(members::by_card));

    // Loan lifecycle
    let loans = Router::new()
        .route("/api/loans/checkout", post(loans::checkout))
        .route("/api/loans/return", post(loans::return_loan))
        .route("/api/loans/swap", post(loans::swap))
        .route("/api/loans/active/{member_id}", get(loans::active));

    // Photo intake (multipart or remote URL)
    let uploads = Router::new()
        .route("/api/uploads/loan-photo", post(uploads::upload_loan_photo))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));

    // Shopify webhooks (signature-verified, raw body)
    let webhooks = Router::new()
        .route("/api/webhooks/subscription", post(webhooks::subscription))
        .route(
            "/api/webhooks/customers/delete",
            post(webhooks::customers_delete),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .merge(members)
        .merge(loans)
        .merge(uploads)
        .merge(webhooks)
        .layer(middleware::from_fn_with_state(
            state.idempotency.clone(),
            idempotency_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
