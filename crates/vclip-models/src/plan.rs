//! Plan tiers and per-tier usage limits.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Subscription tier, from unauthenticated/free through the top paid tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Student,
    Starter,
    Pro,
    Expert,
    Team,
    Unlimited,
}

impl PlanTier {
    /// Parse from string (case-insensitive), defaulting to `Free` on no match.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "student" => PlanTier::Student,
            "starter" => PlanTier::Starter,
            "pro" => PlanTier::Pro,
            "expert" => PlanTier::Expert,
            "team" => PlanTier::Team,
            "unlimited" => PlanTier::Unlimited,
            _ => PlanTier::Free,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Student => "student",
            PlanTier::Starter => "starter",
            PlanTier::Pro => "pro",
            PlanTier::Expert => "expert",
            PlanTier::Team => "team",
            PlanTier::Unlimited => "unlimited",
        }
    }

    /// Whether this tier is at least as privileged as `other`, in the
    /// fixed tier ordering (used by the enrichment controller's decision
    /// table, e.g. "plan >= Pro").
    pub fn at_least(&self, other: PlanTier) -> bool {
        self.rank() >= other.rank()
    }

    fn rank(&self) -> u8 {
        match self {
            PlanTier::Free => 0,
            PlanTier::Student => 1,
            PlanTier::Starter => 2,
            PlanTier::Pro => 3,
            PlanTier::Expert => 4,
            PlanTier::Team => 5,
            PlanTier::Unlimited => 6,
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Enrichment aggressiveness granted to a plan (see `vclip_core::chat::enrichment`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentLevel {
    None,
    Light,
    Full,
    Deep,
}

impl EnrichmentLevel {
    /// Maximum number of external sources this level may cite.
    pub fn max_sources(&self) -> usize {
        match self {
            EnrichmentLevel::None => 0,
            EnrichmentLevel::Light => 2,
            EnrichmentLevel::Full => 5,
            EnrichmentLevel::Deep => 8,
        }
    }
}

/// Per-tier usage limits. `-1` means unlimited.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanLimits {
    pub plan_id: String,
    pub monthly_analyses: i64,
    pub chat_daily_limit: i64,
    pub chat_per_video_limit: i64,
    pub web_search_monthly: i64,
    pub web_search_enabled: bool,
    pub default_model: String,
    pub enrichment_level: EnrichmentLevel,
}

impl PlanLimits {
    pub fn for_tier(tier: PlanTier) -> Self {
        match tier {
            PlanTier::Free => Self {
                plan_id: "free".into(),
                monthly_analyses: 5,
                chat_daily_limit: 10,
                chat_per_video_limit: 5,
                web_search_monthly: 0,
                web_search_enabled: false,
                default_model: "mistral-small".into(),
                enrichment_level: EnrichmentLevel::None,
            },
            PlanTier::Student => Self {
                plan_id: "student".into(),
                monthly_analyses: 30,
                chat_daily_limit: 40,
                chat_per_video_limit: 15,
                web_search_monthly: 10,
                web_search_enabled: true,
                default_model: "mistral-small".into(),
                enrichment_level: EnrichmentLevel::Light,
            },
            PlanTier::Starter => Self {
                plan_id: "starter".into(),
                monthly_analyses: 60,
                chat_daily_limit: 60,
                chat_per_video_limit: 20,
                web_search_monthly: 30,
                web_search_enabled: true,
                default_model: "mistral-small".into(),
                enrichment_level: EnrichmentLevel::Light,
            },
            PlanTier::Pro => Self {
                plan_id: "pro".into(),
                monthly_analyses: 200,
                chat_daily_limit: 150,
                chat_per_video_limit: 50,
                web_search_monthly: 150,
                web_search_enabled: true,
                default_model: "gpt-4-class".into(),
                enrichment_level: EnrichmentLevel::Full,
            },
            PlanTier::Expert => Self {
                plan_id: "expert".into(),
                monthly_analyses: 500,
                chat_daily_limit: 400,
                chat_per_video_limit: 100,
                web_search_monthly: 500,
                web_search_enabled: true,
                default_model: "gpt-4-class".into(),
                enrichment_level: EnrichmentLevel::Deep,
            },
            PlanTier::Team => Self {
                plan_id: "team".into(),
                monthly_analyses: 1500,
                chat_daily_limit: 1000,
                chat_per_video_limit: 300,
                web_search_monthly: 1500,
                web_search_enabled: true,
                default_model: "gpt-4-class".into(),
                enrichment_level: EnrichmentLevel::Deep,
            },
            PlanTier::Unlimited => Self {
                plan_id: "unlimited".into(),
                monthly_analyses: -1,
                chat_daily_limit: -1,
                chat_per_video_limit: -1,
                web_search_monthly: -1,
                web_search_enabled: true,
                default_model: "gpt-4-class".into(),
                enrichment_level: EnrichmentLevel::Deep,
            },
        }
    }

    /// `true` if `used` has not yet reached `limit` (a limit of `-1` always allows).
    pub fn allows(limit: i64, used: i64) -> bool {
        limit < 0 || used < limit
    }
}

/// Full plan-limits table, keyed by tier; the default is generated from
/// `PlanLimits::for_tier` for every variant and may be overridden by
/// operator configuration (see `CoreConfig::plan_limits`).
pub fn default_plan_limits_table() -> HashMap<PlanTier, PlanLimits> {
    [
        PlanTier::Free,
        PlanTier::Student,
        PlanTier::Starter,
        PlanTier::Pro,
        PlanTier::Expert,
        PlanTier::Team,
        PlanTier::Unlimited,
    ]
    .into_iter()
    .map(|tier| (tier, PlanLimits::for_tier(tier)))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_from_str_roundtrip() {
        for tier in [
            PlanTier::Free,
            PlanTier::Student,
            PlanTier::Starter,
            PlanTier::Pro,
            PlanTier::Expert,
            PlanTier::Team,
            PlanTier::Unlimited,
        ] {
            assert_eq!(PlanTier::from_str(tier.as_str()), tier);
        }
        assert_eq!(PlanTier::from_str("bogus"), PlanTier::Free);
    }

    #[test]
    fn at_least_ordering() {
        assert!(PlanTier::Pro.at_least(PlanTier::Starter));
        assert!(!PlanTier::Starter.at_least(PlanTier::Pro));
        assert!(PlanTier::Unlimited.at_least(PlanTier::Unlimited));
    }

    #[test]
    fn unlimited_allows_any_usage() {
        let limits = PlanLimits::for_tier(PlanTier::Unlimited);
        assert!(PlanLimits::allows(limits.chat_daily_limit, 10_000));
    }

    #[test]
    fn free_tier_enforces_daily_cap() {
        let limits = PlanLimits::for_tier(PlanTier::Free);
        assert!(PlanLimits::allows(limits.chat_daily_limit, 9));
        assert!(!PlanLimits::allows(limits.chat_daily_limit, 10));
    }

    #[test]
    fn default_table_has_all_tiers() {
        let table = default_plan_limits_table();
        assert_eq!(table.len(), 7);
    }
}
