//! Tier policy table
//!
//! Allowances per tier. Loaded once at startup and never mutated.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shared::models::{Allowances, Member, Tier};
use thiserror::Error;

/// Monthly allowances for one tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Checkouts (including swaps) per cycle
    pub items_per_month: i32,
    /// Swaps per cycle
    pub swaps: i32,
    /// Loans that may be out at the same time
    pub max_items_out: i32,
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid tier policy document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{tier} policy has a negative {field}")]
    Negative { tier: Tier, field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPolicyTable {
    basic: TierPolicy,
    plus: TierPolicy,
    premium: TierPolicy,
}

impl Default for TierPolicyTable {
    fn default() -> Self {
        Self {
            basic: TierPolicy {
                items_per_month: 1,
                swaps: 0,
                max_items_out: 1,
            },
            plus: TierPolicy {
                items_per_month: 5,
                swaps: 2,
                max_items_out: 2,
            },
            premium: TierPolicy {
                items_per_month: 10,
                swaps: 5,
                max_items_out: 4,
            },
        }
    }
}

impl TierPolicyTable {
    pub fn policy(&self, tier: Tier) -> TierPolicy {
        match tier {
            Tier::Basic => self.basic,
            Tier::Plus => self.plus,
            Tier::Premium => self.premium,
        }
    }

    /// Parse an override document keyed by wire tier name.
    ///
    /// Tiers absent from the document keep their default allowances.
    pub fn from_json(doc: &str) -> Result<Self, PolicyError> {
        let overrides: HashMap<Tier, TierPolicy> = serde_json::from_str(doc)?;
        let mut table = Self::default();
        for (tier, policy) in overrides {
            for (field, value) in [
                ("items_per_month", policy.items_per_month),
                ("swaps", policy.swaps),
                ("max_items_out", policy.max_items_out),
            ] {
                if value < 0 {
                    return Err(PolicyError::Negative { tier, field });
                }
            }
            match tier {
                Tier::Basic => table.basic = policy,
                Tier::Plus => table.plus = policy,
                Tier::Premium => table.premium = policy,
            }
        }
        Ok(table)
    }

    /// Remaining quota for a member's current cycle
    pub fn allowances(&self, member: &Member) -> Allowances {
        let policy = self.policy(member.tier);
        Allowances {
            tier: member.tier,
            items_per_month: policy.items_per_month,
            items_used: member.items_used,
            items_remaining: (policy.items_per_month - member.items_used).max(0),
            swaps_per_month: policy.swaps,
            swaps_used: member.swaps_used,
            swaps_remaining: (policy.swaps - member.swaps_used).max(0),
            max_items_out: policy.max_items_out,
            items_out: member.items_out,
            cycle_end: member.cycle_end,
        }
    }
}
