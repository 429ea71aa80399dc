use super::tier::Tier;
use serde::{Deserialize, Serialize};

/// A named partition at a given tier, produced by the offline clustering
/// pipeline. Read-only to the feed engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Community {
    pub code: String,
    pub tier: Tier,
    pub population: i64,
}

/// A user's community assignment across all six tiers. One record per user,
/// maintained by the ingestion pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub user_id: String,
    pub gigacluster: Option<String>,
    pub supercluster: Option<String>,
    pub cluster: Option<String>,
    pub galaxy: Option<String>,
    pub nebula: Option<String>,
    pub constellation: Option<String>,
}

impl MembershipRecord {
    pub fn community_at(&self, tier: Tier) -> Option<&str> {
        match tier {
            Tier::Gigacluster => self.gigacluster.as_deref(),
            Tier::Supercluster => self.supercluster.as_deref(),
            Tier::Cluster => self.cluster.as_deref(),
            Tier::Galaxy => self.galaxy.as_deref(),
            Tier::Nebula => self.nebula.as_deref(),
            Tier::Constellation => self.constellation.as_deref(),
        }
    }

    /// Community codes across every tier the user is assigned to.
    pub fn all_codes(&self) -> Vec<String> {
        Tier::ALL
            .iter()
            .filter_map(|tier| self.community_at(*tier).map(str::to_string))
            .collect()
    }
}

/// A liked-community aggregation row: the subject's community at the feed
/// tier plus the summed affinity that put it there.
#[derive(Debug, Clone)]
pub struct LikedCommunity {
    pub community: String,
    pub subject: String,
}
