pub mod store;

pub use store::{
    CommunityFilter, CommunityPredicate, CommunityStore, FollowsGraph, ItemStore, OverrideStore,
    RankedMode, RankedQuery, UsageRecorder,
};
