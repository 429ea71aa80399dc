use crate::application::ports::store::{
    CommunityFilter, CommunityPredicate, ItemStore, RankedMode, RankedQuery,
};
use crate::domain::entities::{CommunityProfile, Item, Tier};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Per-stream retrieval knobs, carved out of the feed definition by the
/// orchestrator.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub gravity: f64,
    pub skip_replies: bool,
    pub limit: u32,
    /// Broaden the filter with the explore community when the personalized
    /// sets fell short of the target.
    pub with_wide_explore: bool,
}

#[derive(Debug, Clone)]
pub struct FirstPageOptions {
    pub seed: u64,
    /// Probability that a reply keeps its rank on the first page; the rest
    /// are zeroed so top-level posts get the first-page edge without replies
    /// being permanently hidden.
    pub reply_ratio: f64,
    pub min_quality: i64,
    pub window_hours: i64,
}

pub struct RankedRetriever {
    items: Arc<dyn ItemStore>,
}

impl RankedRetriever {
    pub fn new(items: Arc<dyn ItemStore>) -> Self {
        Self { items }
    }

    /// First-page retrieval: recent window, quality floor, then seeded
    /// dampening of reply ranks. No cursor boundary exists yet, so this mode
    /// is allowed to be randomized — the seed makes it replayable.
    pub async fn first_page(
        &self,
        profile: &CommunityProfile,
        opts: &StreamOptions,
        first_page: &FirstPageOptions,
        now: DateTime<Utc>,
    ) -> Result<Vec<Item>, AppError> {
        let filter = build_filter(profile, opts.with_wide_explore);
        let query = RankedQuery {
            mode: RankedMode::FirstPage {
                window_hours: first_page.window_hours,
                min_quality: first_page.min_quality,
            },
            gravity: opts.gravity,
            skip_replies: opts.skip_replies,
            limit: opts.limit,
            now,
        };

        let mut items = self.items.query_ranked(&filter, &query).await?;
        dampen_replies(&mut items, first_page.seed, first_page.reply_ratio);
        debug!(count = items.len(), "retrieved first-page stream");
        Ok(items)
    }

    /// Continuation retrieval: strictly reproducible, bounded by the
    /// previous page's rank so pagination never moves backwards.
    pub async fn continuation(
        &self,
        profile: &CommunityProfile,
        opts: &StreamOptions,
        boundary: f64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Item>, AppError> {
        let filter = build_filter(profile, opts.with_wide_explore);
        let query = RankedQuery {
            mode: RankedMode::Continuation { max_rank: boundary },
            gravity: opts.gravity,
            skip_replies: opts.skip_replies,
            limit: opts.limit,
            now,
        };

        let items = self.items.query_ranked(&filter, &query).await?;
        debug!(count = items.len(), boundary, "retrieved continuation stream");
        Ok(items)
    }
}

/// Turns the resolved profile into the typed community filter the store
/// understands. The explore community only participates when personalization
/// came up short (or this slice carries no personalized sets at all).
pub fn build_filter(profile: &CommunityProfile, with_wide_explore: bool) -> CommunityFilter {
    let mut any_of = vec![CommunityPredicate::Equals(
        profile.home.tier,
        profile.home.code.clone(),
    )];

    if with_wide_explore || (profile.liked.is_empty() && profile.expanded.is_empty()) {
        any_of.push(CommunityPredicate::Equals(
            profile.explore.tier,
            profile.explore.code.clone(),
        ));
    }
    // Liked and expanded codes live at the feed tier, which is not
    // necessarily home's tier: a missing membership record puts home on the
    // default community at whatever tier that one sits at.
    if !profile.liked.is_empty() {
        any_of.push(CommunityPredicate::InSet(profile.tier, profile.liked.clone()));
    }
    if !profile.expanded.is_empty() {
        any_of.push(CommunityPredicate::InSet(
            profile.tier,
            profile.expanded.clone(),
        ));
    }
    for (tier, codes) in group_by_tier(&profile.include) {
        any_of.push(CommunityPredicate::InSet(tier, codes));
    }

    let all_of = group_by_tier(&profile.exclude)
        .into_iter()
        .map(|(tier, codes)| CommunityPredicate::NotInSet(tier, codes))
        .collect();

    CommunityFilter { any_of, all_of }
}

/// Override lists carry raw community codes whose tier is the code's prefix
/// character; bucket them per tier so the filter stays typed.
fn group_by_tier(codes: &[String]) -> Vec<(Tier, Vec<String>)> {
    let mut grouped: HashMap<Tier, Vec<String>> = HashMap::new();
    for code in codes {
        if let Some(tier) = code.chars().next().and_then(Tier::from_prefix) {
            grouped.entry(tier).or_default().push(code.clone());
        }
    }
    let mut pairs: Vec<(Tier, Vec<String>)> = grouped.into_iter().collect();
    // stable predicate order for reproducible queries
    pairs.sort_by_key(|(tier, _)| tier.prefix());
    pairs
}

/// Seeded reply dampening: one draw per item position so a given seed makes
/// the same choices at the same relative positions on every replay. Zeroed
/// replies sink below everything still ranked.
fn dampen_replies(items: &mut [Item], seed: u64, reply_ratio: f64) {
    let ratio = reply_ratio.clamp(0.0, 1.0);
    let mut rng = StdRng::seed_from_u64(seed);
    for item in items.iter_mut() {
        let keep = rng.gen_bool(ratio);
        if item.is_reply() && !keep {
            item.rank = Some(0.0);
        }
    }
    items.sort_by(|a, b| {
        let ra = a.rank.unwrap_or(0.0);
        let rb = b.rank.unwrap_or(0.0);
        rb.total_cmp(&ra).then_with(|| a.uri.cmp(&b.uri))
    });
}
