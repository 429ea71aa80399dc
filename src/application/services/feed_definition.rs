use crate::domain::entities::{CommunityRef, FeedOverride, Tier};

/// Static tuning for one published feed. Per-user deviations come from
/// `FeedOverride` and are folded in by [`FeedDefinition::resolve`].
#[derive(Debug, Clone)]
pub struct FeedDefinition {
    /// Short identifier used in cursors, overrides and usage rows (max 15
    /// chars downstream).
    pub feed_id: String,
    pub display_name: String,
    pub tier: Tier,
    /// Substituted when a user has no membership record, so every user gets
    /// a non-empty feed.
    pub default_community: CommunityRef,
    /// How many personalized communities the selector tries to fill in
    /// total (liked + expanded).
    pub total_communities: u32,
    pub trusted_friends_limit: u32,

    // first page
    pub first_page_gravity: f64,
    pub first_page_reply_ratio: f64,
    pub first_page_min_quality: i64,
    pub first_page_lookup_multiplier: u32,
    pub first_page_randomize_dedup: bool,
    pub first_page_follows_rate: u32,
    pub recency_window_hours: i64,

    // home stream
    pub home_gravity: f64,
    pub home_skip_replies: bool,
    pub home_slots: u32,
    pub home_lookup_multiplier: u32,
    pub home_randomize_dedup: bool,
    pub follows_rate: u32,

    // discover stream
    pub discover_gravity: f64,
    pub discover_skip_replies: bool,
    pub discover_slots: u32,
    pub discover_rate: u32,
    pub discover_lookup_multiplier: u32,
    pub discover_randomize_dedup: bool,
}

impl Default for FeedDefinition {
    fn default() -> Self {
        Self {
            feed_id: "nebula_plus".to_string(),
            display_name: "My Nebula+".to_string(),
            tier: Tier::Nebula,
            default_community: CommunityRef {
                code: "s100".to_string(),
                tier: Tier::Supercluster,
            },
            total_communities: 8,
            trusted_friends_limit: 5,
            first_page_gravity: 3.0,
            first_page_reply_ratio: 0.5,
            first_page_min_quality: 2,
            first_page_lookup_multiplier: 3,
            first_page_randomize_dedup: true,
            first_page_follows_rate: 5,
            recency_window_hours: 24,
            home_gravity: 4.0,
            home_skip_replies: false,
            home_slots: 5,
            home_lookup_multiplier: 2,
            home_randomize_dedup: false,
            follows_rate: 5,
            discover_gravity: 3.0,
            discover_skip_replies: true,
            discover_slots: 5,
            discover_rate: 3,
            discover_lookup_multiplier: 2,
            discover_randomize_dedup: false,
        }
    }
}

/// Override-affected knobs, resolved exactly once per request. Every
/// downstream count (slices, rates, the wide-explore test) derives from this
/// one value so the home and discover sides of a request can never disagree.
#[derive(Debug, Clone)]
pub struct EffectiveFeedConfig {
    pub feed_id: String,
    pub tier: Tier,
    pub default_community: CommunityRef,
    pub total_communities: u32,
    pub trusted_friends_limit: u32,
    pub home_slots: u32,
    pub discover_slots: u32,
    pub discover_rate: u32,
    pub follows_rate: u32,
    pub first_page_follows_rate: u32,
    pub hide_replies: bool,
    pub hide_follows: bool,
    pub opt_out: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl FeedDefinition {
    pub fn resolve(&self, feed_override: Option<FeedOverride>) -> EffectiveFeedConfig {
        let ov = feed_override.map(FeedOverride::sanitized).unwrap_or_default();
        EffectiveFeedConfig {
            feed_id: self.feed_id.clone(),
            tier: self.tier,
            default_community: self.default_community.clone(),
            total_communities: self.total_communities,
            trusted_friends_limit: self.trusted_friends_limit,
            home_slots: ov.home_slots.unwrap_or(self.home_slots),
            discover_slots: ov.discover_slots.unwrap_or(self.discover_slots),
            discover_rate: ov.discover_rate.unwrap_or(self.discover_rate).max(1),
            follows_rate: ov.follows_rate.unwrap_or(self.follows_rate).max(1),
            first_page_follows_rate: ov
                .follows_rate
                .unwrap_or(self.first_page_follows_rate)
                .max(1),
            hide_replies: ov.hide_replies.unwrap_or(false),
            hide_follows: ov.hide_follows.unwrap_or(false),
            opt_out: ov.opt_out,
            include: ov.include_communities,
            exclude: ov.exclude_communities,
        }
    }
}
