pub mod community;
pub mod feed_override;
pub mod item;
pub mod profile;
pub mod tier;

pub use community::{Community, LikedCommunity, MembershipRecord};
pub use feed_override::FeedOverride;
pub use item::{FeedItemRef, Item};
pub use profile::{CommunityProfile, CommunityRef};
pub use tier::Tier;
