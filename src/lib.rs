//! Feed composition engine for a community-partitioned social graph.
//!
//! The engine assembles personalized feed pages out of two decay-ranked
//! community streams (home and discover), weaves in recent posts from the
//! requester's follows, and paginates through a seeded cursor that keeps
//! every page of a session reproducible.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

use application::ports::{CommunityStore, FollowsGraph, ItemStore, OverrideStore, UsageRecorder};
use application::services::{CommunitySelector, FollowsInjector, RankedRetriever};
use std::sync::Arc;

pub use application::services::{FeedDefinition, FeedOrchestrator, FeedPage, FeedRequest};
pub use infrastructure::database::{ConnectionPool, SqliteStore};
pub use shared::{init_logging, AppConfig, AppError};

/// Wires a feed over a single SQLite store backing every port.
pub fn build_orchestrator(store: Arc<SqliteStore>, definition: FeedDefinition) -> FeedOrchestrator {
    let communities: Arc<dyn CommunityStore> = store.clone();
    let items: Arc<dyn ItemStore> = store.clone();
    let overrides: Arc<dyn OverrideStore> = store.clone();
    let graph: Arc<dyn FollowsGraph> = store.clone();
    let usage: Arc<dyn UsageRecorder> = store;

    FeedOrchestrator::new(
        definition,
        CommunitySelector::new(communities),
        RankedRetriever::new(items.clone()),
        FollowsInjector::new(graph, items),
        overrides,
        usage,
    )
}
