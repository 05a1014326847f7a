//! Static feature gate tables
//!
//! Process-wide constant data, loaded once and never mutated: which
//! tiers may use each gated feature, and the monthly Free-tier quota
//! for each usage-limited feature. Adding a feature is adding a match
//! arm here; the lifecycle service never changes.

use skillforge_types::Tier;

const ALL_TIERS: &[Tier] = &[Tier::Free, Tier::Premium, Tier::Enterprise];
const PAID_TIERS: &[Tier] = &[Tier::Premium, Tier::Enterprise];
const ENTERPRISE_ONLY: &[Tier] = &[Tier::Enterprise];

/// Tiers allowed to use a feature. A feature absent from this table is
/// inaccessible to everyone (fails closed).
pub fn tiers_for(feature: &str) -> Option<&'static [Tier]> {
    match feature {
        // Core learning features, quota-limited on Free
        "roadmaps" | "interview_sessions" | "project_ideas" | "resume_reviews" => Some(ALL_TIERS),
        // Paid-only features
        "github_export" | "ai_interview_feedback" | "job_matching" | "custom_roadmaps" => {
            Some(PAID_TIERS)
        }
        // Enterprise features
        "team_workspaces" | "priority_support" => Some(ENTERPRISE_ONLY),
        _ => None,
    }
}

/// Whether a tier may use a feature (fail-closed for unknown features)
pub fn tier_allows(feature: &str, tier: Tier) -> bool {
    tiers_for(feature).is_some_and(|tiers| tiers.contains(&tier))
}

/// Monthly Free-tier quota for a usage-limited feature. Paid tiers are
/// implicitly unlimited; a feature absent here is not usage-gated.
pub fn free_tier_limit(feature: &str) -> Option<i64> {
    match feature {
        "roadmaps" => Some(1),
        "interview_sessions" => Some(5),
        "project_ideas" => Some(3),
        "resume_reviews" => Some(1),
        _ => None,
    }
}

/// Every usage-limited feature with its Free-tier quota, for the
/// usage-stats summary endpoint
pub fn free_tier_limits() -> &'static [(&'static str, i64)] {
    &[
        ("roadmaps", 1),
        ("interview_sessions", 5),
        ("project_ideas", 3),
        ("resume_reviews", 1),
    ]
}
