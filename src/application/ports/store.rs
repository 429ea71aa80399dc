use crate::domain::entities::{
    Community, FeedOverride, Item, LikedCommunity, MembershipRecord, Tier,
};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One community predicate against a single tier column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommunityPredicate {
    Equals(Tier, String),
    InSet(Tier, Vec<String>),
    NotInSet(Tier, Vec<String>),
}

/// Community restriction passed to the store as plain data: an OR over
/// `any_of`, AND-combined with every predicate in `all_of`. Services build
/// this; only the store adapter turns it into SQL.
#[derive(Debug, Clone, Default)]
pub struct CommunityFilter {
    pub any_of: Vec<CommunityPredicate>,
    pub all_of: Vec<CommunityPredicate>,
}

/// First-page retrieval applies the recency window and quality floor; a
/// continuation is bounded by the previous page's rank instead so ordering
/// stays reproducible.
#[derive(Debug, Clone, PartialEq)]
pub enum RankedMode {
    FirstPage { window_hours: i64, min_quality: i64 },
    Continuation { max_rank: f64 },
}

#[derive(Debug, Clone)]
pub struct RankedQuery {
    pub mode: RankedMode,
    pub gravity: f64,
    pub skip_replies: bool,
    pub limit: u32,
    /// Query-time reference clock for the age term of the decay rank.
    /// Supplied by the caller so results are reproducible under test.
    pub now: DateTime<Utc>,
}

#[async_trait]
pub trait CommunityStore: Send + Sync {
    async fn get_membership(&self, user_id: &str) -> Result<Option<MembershipRecord>, AppError>;

    async fn get_communities(&self, codes: &[String]) -> Result<Vec<Community>, AppError>;

    /// Aggregates the requester's affinity edges by the subject's community
    /// at `tier`, strongest communities first. `home` and `exclude` are
    /// filtered out in the query.
    async fn top_liked_communities(
        &self,
        user_id: &str,
        tier: Tier,
        home: &str,
        exclude: &[String],
        limit: u32,
    ) -> Result<Vec<LikedCommunity>, AppError>;

    /// Second-hop aggregation through the given subjects' own affinity
    /// edges, skipping communities already selected.
    async fn trusted_friends_communities(
        &self,
        subjects: &[String],
        tier: Tier,
        home: &str,
        already_selected: &[String],
        exclude: &[String],
        limit: u32,
    ) -> Result<Vec<String>, AppError>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Decay-ranked retrieval over the filtered community set. Items come
    /// back rank-descending with their `rank` populated.
    async fn query_ranked(
        &self,
        filter: &CommunityFilter,
        query: &RankedQuery,
    ) -> Result<Vec<Item>, AppError>;

    /// Most-recent-first items by the given authors, strictly older than
    /// `before` when set.
    async fn chronological_by_authors(
        &self,
        authors: &[String],
        before: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<Item>, AppError>;
}

#[async_trait]
pub trait OverrideStore: Send + Sync {
    async fn get_override(
        &self,
        user_id: &str,
        feed_id: &str,
    ) -> Result<Option<FeedOverride>, AppError>;
}

/// The social-graph follows source, an external collaborator.
#[async_trait]
pub trait FollowsGraph: Send + Sync {
    async fn get_follows(&self, user_id: &str) -> Result<Vec<String>, AppError>;
}

/// Usage/telemetry hook, invoked exactly once per request. `output_count`
/// is -1 when the request degraded at the error boundary.
#[async_trait]
pub trait UsageRecorder: Send + Sync {
    async fn record_usage(
        &self,
        user_id: &str,
        feed_id: &str,
        limit: u32,
        output_count: i64,
    ) -> Result<(), AppError>;
}
