//! Member enrollment and card lookup

use axum::Json;
use axum::extract::{Path, State};
use http::StatusCode;
use serde_json::json;
use shared::error::{AppError, ErrorCode};
use shared::models::{LoanSummary, Member, MemberCreate, MemberOverview};

use crate::db;
use crate::error::ServiceResult;
use crate::ledger::{Cycle, cycle};
use crate::state::AppState;
use crate::validation::{MAX_SHORT_TEXT_LEN, validate_optional_text, validate_required_text};

/// POST /api/members — enroll a member with a fresh one-month cycle
pub async fn enroll(
    State(state): State<AppState>,
    Json(req): Json<MemberCreate>,
) -> ServiceResult<(StatusCode, Json<Member>)> {
    validate_required_text(&req.card_token, "card_token", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&req.shopify_customer_id, "shopify_customer_id", MAX_SHORT_TEXT_LEN)?;

    let now = shared::util::now_millis();
    let id = shared::util::new_id();

    let member = db::members::create(&state.pool, &id, &req, Cycle::starting_at(now), now)
        .await
        .map_err(|e| db::members::write_error(e, &req.card_token))?;

    db::audit::log(
        &state.pool,
        &member.id,
        "member_enrolled",
        &json!({ "tier": member.tier, "card_token": member.card_token }),
        now,
    )
    .await?;

    tracing::info!(member_id = %member.id, tier = %member.tier, "Member enrolled");

    Ok((StatusCode::CREATED, Json(member)))
}

/// GET /api/members/by-card/{card_token} — member, allowances and loans out
///
/// A lapsed cycle is shown as it will be after the next roll; nothing is written.
pub async fn by_card(
    State(state): State<AppState>,
    Path(card_token): Path<String>,
) -> ServiceResult<Json<MemberOverview>> {
    validate_required_text(&card_token, "card_token", MAX_SHORT_TEXT_LEN)?;

    let member = db::members::find_by_card(&state.pool, &card_token)
        .await?
        .ok_or_else(|| {
            AppError::new(ErrorCode::MemberNotFound).with_detail("card_token", card_token.as_str())
        })?;

    let member = cycle::projected(&member, shared::util::now_millis());
    let loans = db::loans::find_active(&state.pool, &member.id).await?;

    Ok(Json(MemberOverview {
        allowances: state.policies().allowances(&member),
        active_loans: loans.iter().map(LoanSummary::from).collect(),
        member,
    }))
}
