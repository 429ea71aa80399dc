use super::tier::Tier;
use serde::{Deserialize, Serialize};

/// A community code together with the tier it lives at. The explore community
/// is auto-picked across all six tiers, so it can sit at a different tier
/// than the feed's own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommunityRef {
    pub code: String,
    pub tier: Tier,
}

/// The communities that represent a requester for one request. Built fresh
/// every time; the personalization signal behind it can change between
/// requests, so this is never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityProfile {
    /// The feed's tier. Liked and expanded codes always live here, even when
    /// `home` fell back to the default community at another tier.
    pub tier: Tier,
    pub home: CommunityRef,
    pub explore: CommunityRef,
    /// Communities of the authors the requester engaged with most, at the
    /// feed tier, strongest first.
    pub liked: Vec<String>,
    /// Second-hop expansion: communities liked by the requester's most-liked
    /// authors.
    pub expanded: Vec<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// The slot total the selector was asked to fill. Personalization is
    /// considered insufficient when liked + expanded fall short of it.
    pub target_total: u32,
}

impl CommunityProfile {
    pub fn personalization_insufficient(&self) -> bool {
        (self.liked.len() + self.expanded.len()) < self.target_total as usize
    }

    /// Restricts the personalized sets to one stream's slot count: liked
    /// communities first, expanded filling only the remainder.
    pub fn sliced(&self, max_count: u32) -> CommunityProfile {
        let max_count = max_count as usize;
        let liked: Vec<String> = self.liked.iter().take(max_count).cloned().collect();
        let remainder = max_count - liked.len();
        let expanded = if remainder == 0 {
            Vec::new()
        } else {
            self.expanded.iter().take(remainder).cloned().collect()
        };
        CommunityProfile {
            liked,
            expanded,
            ..self.clone()
        }
    }

    /// Every community code a returned item is allowed to match.
    pub fn eligible_codes(&self) -> Vec<String> {
        let mut codes = vec![self.home.code.clone(), self.explore.code.clone()];
        codes.extend(self.liked.iter().cloned());
        codes.extend(self.expanded.iter().cloned());
        codes.extend(self.include.iter().cloned());
        codes.retain(|c| !self.exclude.contains(c));
        codes
    }
}
