pub mod entities;
pub mod feed;

pub use entities::{
    Community, CommunityProfile, CommunityRef, FeedItemRef, FeedOverride, Item, MembershipRecord,
    Tier,
};
