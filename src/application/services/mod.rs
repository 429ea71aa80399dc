pub mod community_selector;
pub mod feed_definition;
pub mod feed_orchestrator;
pub mod follows_injector;
pub mod ranked_retriever;

pub use community_selector::CommunitySelector;
pub use feed_definition::{EffectiveFeedConfig, FeedDefinition};
pub use feed_orchestrator::{FeedOrchestrator, FeedPage, FeedRequest};
pub use follows_injector::FollowsInjector;
pub use ranked_retriever::{FirstPageOptions, RankedRetriever, StreamOptions};
