//! Allowance guards
//!
//! Pure checks over a member whose cycle has already been rolled. Every
//! rejection names the tier and the remaining quota.

use shared::error::{AppError, ErrorCode};
use shared::models::{Member, MemberStatus};

use super::policy::TierPolicy;

/// Reject members whose subscription does not allow new loans.
pub fn ensure_active(member: &Member) -> Result<(), AppError> {
    match member.status {
        MemberStatus::Active => Ok(()),
        MemberStatus::Paused => Err(AppError::new(ErrorCode::SubscriptionPaused)
            .with_detail("status", "PAUSED")),
        MemberStatus::Cancelled => Err(AppError::new(ErrorCode::SubscriptionInactive)
            .with_detail("status", "CANCELLED")),
    }
}

/// Monthly item limit and items-out limit, checked in that order.
pub fn ensure_can_checkout(member: &Member, policy: &TierPolicy) -> Result<(), AppError> {
    ensure_active(member)?;

    if member.items_used >= policy.items_per_month {
        return Err(quota_error(
            ErrorCode::ItemAllowanceExhausted,
            member,
            policy.items_per_month,
            member.items_used,
            format!(
                "{} plan: {} of {} items remaining this month",
                member.tier,
                remaining(policy.items_per_month, member.items_used),
                policy.items_per_month
            ),
        ));
    }

    if member.items_out >= policy.max_items_out {
        return Err(quota_error(
            ErrorCode::TooManyItemsOut,
            member,
            policy.max_items_out,
            member.items_out,
            format!(
                "{} plan: Maximum {} items allowed out. Return items to continue.",
                member.tier, policy.max_items_out
            ),
        ));
    }

    Ok(())
}

/// Swap limit, then the monthly item limit (a swap issues a new item), then
/// whether anything is out to swap.
pub fn ensure_can_swap(member: &Member, policy: &TierPolicy) -> Result<(), AppError> {
    ensure_active(member)?;

    if member.swaps_used >= policy.swaps {
        return Err(quota_error(
            ErrorCode::SwapAllowanceExhausted,
            member,
            policy.swaps,
            member.swaps_used,
            format!(
                "{} plan: {} of {} swaps remaining this month",
                member.tier,
                remaining(policy.swaps, member.swaps_used),
                policy.swaps
            ),
        ));
    }

    if member.items_used >= policy.items_per_month {
        return Err(quota_error(
            ErrorCode::ItemAllowanceExhausted,
            member,
            policy.items_per_month,
            member.items_used,
            format!("{} plan: Monthly item limit reached", member.tier),
        ));
    }

    if member.items_out <= 0 {
        return Err(AppError::new(ErrorCode::NothingToSwap)
            .with_detail("tier", member.tier.as_str())
            .with_detail("items_out", member.items_out));
    }

    Ok(())
}

fn remaining(limit: i32, used: i32) -> i32 {
    (limit - used).max(0)
}

fn quota_error(code: ErrorCode, member: &Member, limit: i32, used: i32, message: String) -> AppError {
    AppError::with_message(code, message)
        .with_detail("tier", member.tier.as_str())
        .with_detail("limit", limit)
        .with_detail("used", used)
        .with_detail("remaining", remaining(limit, used))
}
