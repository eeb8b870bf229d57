//! Loan lifecycle API
//!
//! Thin wrappers over [`LoanLedger`](crate::ledger::LoanLedger); every rule
//! lives in the ledger.

use axum::Json;
use axum::extract::{Path, State};
use http::StatusCode;
use shared::models::{
    CheckoutRequest, Loan, LoanDetail, ReturnRequest, SwapOutcome, SwapRequest,
};

use crate::error::ServiceResult;
use crate::state::AppState;

/// POST /api/loans/checkout
pub async fn checkout(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> ServiceResult<(StatusCode, Json<LoanDetail>)> {
    let loan = state
        .ledger
        .checkout(&req.member_id, &req.store_location, &req.photo_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// POST /api/loans/return
pub async fn return_loan(
    State(state): State<AppState>,
    Json(req): Json<ReturnRequest>,
) -> ServiceResult<Json<Loan>> {
    let loan = state.ledger.return_loan(&req.member_id, &req.loan_id).await?;
    Ok(Json(loan))
}

/// POST /api/loans/swap
pub async fn swap(
    State(state): State<AppState>,
    Json(req): Json<SwapRequest>,
) -> ServiceResult<Json<SwapOutcome>> {
    let outcome = state
        .ledger
        .swap(
            &req.member_id,
            &req.loan_id,
            &req.store_location,
            &req.photo_ids,
        )
        .await?;
    Ok(Json(outcome))
}

/// GET /api/loans/active/{member_id}
pub async fn active(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> ServiceResult<Json<Vec<LoanDetail>>> {
    Ok(Json(state.ledger.active_loans(&member_id).await?))
}
