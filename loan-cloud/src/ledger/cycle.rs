//! Monthly usage cycle
//!
//! Cycles are rolled lazily: the first mutating operation after `cycle_end`
//! persists the next window before any allowance check runs.

use chrono::{DateTime, Months, Utc};
use shared::models::Member;

use super::store::LedgerTx;
use crate::error::BoxError;

pub const DAY_MS: i64 = 86_400_000;

/// A usage window `[start, end)` in Unix milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle {
    pub start: i64,
    pub end: i64,
}

impl Cycle {
    /// Window opening at `start` and closing one calendar month later
    pub fn starting_at(start: i64) -> Self {
        Self {
            start,
            end: add_one_month(start),
        }
    }
}

/// Add one calendar month in UTC, clamping to the last day of shorter months.
pub fn add_one_month(ms: i64) -> i64 {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .and_then(|dt| dt.checked_add_months(Months::new(1)))
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| ms.saturating_add(30 * DAY_MS))
}

/// The window that follows the member's current one, if the current one has ended.
///
/// Advances a single month even when several have lapsed.
pub fn next_cycle(member: &Member, now: i64) -> Option<Cycle> {
    if now < member.cycle_end {
        return None;
    }
    Some(Cycle::starting_at(member.cycle_end))
}

/// The member as the next mutating operation will see it, without writing.
///
/// Used by read paths so a lapsed cycle shows fresh allowances.
pub fn projected(member: &Member, now: i64) -> Member {
    match next_cycle(member, now) {
        Some(cycle) => Member {
            cycle_start: cycle.start,
            cycle_end: cycle.end,
            items_used: 0,
            swaps_used: 0,
            ..member.clone()
        },
        None => member.clone(),
    }
}

/// Persist the next cycle inside `tx` when the current one has ended.
///
/// Returns the member as re-read after the write, or unchanged when the
/// cycle is still running.
pub async fn roll_cycle_if_expired<T: LedgerTx>(
    tx: &mut T,
    member: Member,
    now: i64,
) -> Result<Member, BoxError> {
    let Some(cycle) = next_cycle(&member, now) else {
        return Ok(member);
    };

    let rolled = tx.roll_cycle(&member.id, cycle, now).await?;
    tracing::info!(
        member_id = %rolled.id,
        cycle_start = cycle.start,
        cycle_end = cycle.end,
        "Usage cycle rolled over"
    );
    if cycle.end <= now {
        tracing::warn!(
            member_id = %rolled.id,
            cycle_end = cycle.end,
            "Member still behind after advancing one cycle"
        );
    }
    Ok(rolled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared::models::{MemberStatus, Tier};

    fn ms(y: i32, m: u32, d: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn member_with_cycle(start: i64, end: i64) -> Member {
        Member {
            id: "m-1".into(),
            card_token: "card-1".into(),
            shopify_customer_id: None,
            tier: Tier::Plus,
            status: MemberStatus::Active,
            cycle_start: start,
            cycle_end: end,
            items_used: 3,
            swaps_used: 1,
            items_out: 2,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_add_one_month_clamps_to_month_end() {
        assert_eq!(add_one_month(ms(2024, 1, 31)), ms(2024, 2, 29));
        assert_eq!(add_one_month(ms(2023, 1, 31)), ms(2023, 2, 28));
        assert_eq!(add_one_month(ms(2024, 12, 15)), ms(2025, 1, 15));
    }

    #[test]
    fn test_no_roll_before_cycle_end() {
        let member = member_with_cycle(ms(2024, 3, 1), ms(2024, 4, 1));
        assert_eq!(next_cycle(&member, ms(2024, 3, 20)), None);
        assert_eq!(next_cycle(&member, ms(2024, 4, 1) - 1), None);
    }

    #[test]
    fn test_roll_at_exact_cycle_end() {
        let member = member_with_cycle(ms(2024, 3, 1), ms(2024, 4, 1));
        assert_eq!(
            next_cycle(&member, ms(2024, 4, 1)),
            Some(Cycle {
                start: ms(2024, 4, 1),
                end: ms(2024, 5, 1),
            })
        );
    }

    #[test]
    fn test_multi_month_lapse_advances_one_month() {
        let member = member_with_cycle(ms(2024, 1, 1), ms(2024, 2, 1));
        let cycle = next_cycle(&member, ms(2024, 6, 10)).unwrap();
        assert_eq!(cycle.start, ms(2024, 2, 1));
        assert_eq!(cycle.end, ms(2024, 3, 1));
    }

    #[test]
    fn test_projected_resets_usage_without_touching_items_out() {
        let member = member_with_cycle(ms(2024, 3, 1), ms(2024, 4, 1));

        let running = projected(&member, ms(2024, 3, 15));
        assert_eq!(running, member);

        let lapsed = projected(&member, ms(2024, 4, 2));
        assert_eq!(lapsed.cycle_start, ms(2024, 4, 1));
        assert_eq!(lapsed.cycle_end, ms(2024, 5, 1));
        assert_eq!(lapsed.items_used, 0);
        assert_eq!(lapsed.swaps_used, 0);
        assert_eq!(lapsed.items_out, 2);
    }
}
