use crate::application::ports::store::CommunityStore;
use crate::application::services::feed_definition::EffectiveFeedConfig;
use crate::domain::entities::{Community, CommunityProfile, CommunityRef, MembershipRecord};
use crate::shared::error::AppError;
use std::sync::Arc;
use tracing::debug;

pub struct CommunitySelector {
    communities: Arc<dyn CommunityStore>,
}

impl CommunitySelector {
    pub fn new(communities: Arc<dyn CommunityStore>) -> Self {
        Self { communities }
    }

    /// Builds the request's `CommunityProfile`: home community at the feed
    /// tier, band auto-picked explore community, affinity-driven liked
    /// communities and their trusted-friends expansion, plus override
    /// include/exclude lists. Missing membership or community rows fall back
    /// to the configured default community; this path never fails.
    pub async fn resolve(
        &self,
        user_id: &str,
        cfg: &EffectiveFeedConfig,
    ) -> Result<CommunityProfile, AppError> {
        let membership = self.communities.get_membership(user_id).await?;

        let home = membership
            .as_ref()
            .and_then(|m| m.community_at(cfg.tier))
            .map(|code| CommunityRef {
                code: code.to_string(),
                tier: cfg.tier,
            })
            .unwrap_or_else(|| cfg.default_community.clone());

        let explore = match membership.as_ref() {
            Some(record) => self
                .auto_pick_explore(record)
                .await?
                .unwrap_or_else(|| cfg.default_community.clone()),
            None => cfg.default_community.clone(),
        };

        let mut liked: Vec<String> = Vec::new();
        let mut expanded: Vec<String> = Vec::new();

        if !cfg.opt_out && cfg.total_communities > 0 {
            let liked_limit = cfg.home_slots.min(cfg.total_communities).max(1);
            let liked_rows = self
                .communities
                .top_liked_communities(user_id, cfg.tier, &home.code, &cfg.exclude, liked_limit)
                .await?;

            liked = liked_rows.iter().map(|row| row.community.clone()).collect();

            // Second hop only helps when there is some signal to hop from.
            let shortfall = cfg.total_communities as usize - liked.len().min(cfg.total_communities as usize);
            if !liked.is_empty() && shortfall > 0 {
                let subjects: Vec<String> = liked_rows
                    .iter()
                    .take(cfg.trusted_friends_limit as usize)
                    .map(|row| row.subject.clone())
                    .collect();
                expanded = self
                    .communities
                    .trusted_friends_communities(
                        &subjects,
                        cfg.tier,
                        &home.code,
                        &liked,
                        &cfg.exclude,
                        shortfall as u32,
                    )
                    .await?;
            }
        }

        let mut include = cfg.include.clone();
        include.retain(|code| !cfg.exclude.contains(code));
        liked.retain(|code| !cfg.exclude.contains(code));
        expanded.retain(|code| !cfg.exclude.contains(code));

        let profile = CommunityProfile {
            tier: cfg.tier,
            home,
            explore,
            liked,
            expanded,
            include,
            exclude: cfg.exclude.clone(),
            target_total: cfg.total_communities,
        };

        debug!(
            user_id,
            home = %profile.home.code,
            explore = %profile.explore.code,
            liked = profile.liked.len(),
            expanded = profile.expanded.len(),
            "resolved community profile"
        );

        Ok(profile)
    }

    async fn auto_pick_explore(
        &self,
        membership: &MembershipRecord,
    ) -> Result<Option<CommunityRef>, AppError> {
        let codes = membership.all_codes();
        if codes.is_empty() {
            return Ok(None);
        }
        let communities = self.communities.get_communities(&codes).await?;
        Ok(auto_pick(&communities).map(|c| CommunityRef {
            code: c.code.clone(),
            tier: c.tier,
        }))
    }
}

/// Picks the explore community from a user's tier memberships by population
/// band. The sweet spot is a mid-sized community: big enough to always have
/// content, small enough to still feel personal.
///
/// Fallback order: largest in [5000, 10000); smallest in [10000, 20000);
/// smallest in [20000, 50000); largest in [1000, 5000); smallest >= 50000;
/// finally the single largest membership.
pub fn auto_pick(communities: &[Community]) -> Option<&Community> {
    let largest = |range: std::ops::Range<i64>| {
        communities
            .iter()
            .filter(|c| range.contains(&c.population))
            .max_by_key(|c| (c.population, std::cmp::Reverse(c.code.clone())))
    };
    let smallest = |range: std::ops::Range<i64>| {
        communities
            .iter()
            .filter(|c| range.contains(&c.population))
            .min_by_key(|c| (c.population, c.code.clone()))
    };

    largest(5_000..10_000)
        .or_else(|| smallest(10_000..20_000))
        .or_else(|| smallest(20_000..50_000))
        .or_else(|| largest(1_000..5_000))
        .or_else(|| smallest(50_000..i64::MAX))
        .or_else(|| {
            communities
                .iter()
                .max_by_key(|c| (c.population, std::cmp::Reverse(c.code.clone())))
        })
}
