use crate::application::ports::store::{FollowsGraph, ItemStore};
use crate::domain::entities::Item;
use crate::domain::feed::follows_mix::{mix_follows, FollowsMixOutcome};
use crate::domain::feed::merge::dedup_by_author;
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::debug;

/// Weaves recent posts from the requester's follows into a ranked page.
/// The follows stream is the one part of the page sourced from the social
/// graph rather than from community retrieval.
pub struct FollowsInjector {
    follows: Arc<dyn FollowsGraph>,
    items: Arc<dyn ItemStore>,
}

impl FollowsInjector {
    pub fn new(follows: Arc<dyn FollowsGraph>, items: Arc<dyn ItemStore>) -> Self {
        Self { follows, items }
    }

    /// Fetches the requester's follows, pulls their chronological posts
    /// strictly older than `since` (the previous page's follows boundary),
    /// and injects them into `base` at every `rate`-th slot. Users who
    /// follow nobody get the page back untouched.
    pub async fn inject(
        &self,
        user_id: &str,
        base: Vec<Item>,
        since: Option<DateTime<Utc>>,
        rate: u32,
        seed: u64,
    ) -> Result<FollowsMixOutcome, AppError> {
        let followed = self.follows.get_follows(user_id).await?;
        if followed.is_empty() {
            return Ok(FollowsMixOutcome {
                items: base,
                boundary: None,
            });
        }

        // Overfetch so author dedup still leaves enough candidates.
        let lookup = (base.len() as u32).max(1) * 2;
        let candidates = self
            .items
            .chronological_by_authors(&followed, since, lookup)
            .await?;
        debug!(
            follows = followed.len(),
            candidates = candidates.len(),
            "fetched follows stream"
        );

        let mut rng = StdRng::seed_from_u64(seed);
        let candidates = dedup_by_author(candidates, false, seed, &mut rng);
        Ok(mix_follows(base, candidates, rate, seed))
    }
}
