use serde::{Deserialize, Serialize};

/// Per-user, per-feed customization record. Created lazily the first time a
/// user customizes a feed; absent for everyone else. A fixed struct with
/// optional fields, validated where it is read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedOverride {
    pub user_id: String,
    pub feed_id: String,
    pub opt_out: bool,
    pub hide_replies: Option<bool>,
    pub hide_follows: Option<bool>,
    pub include_communities: Vec<String>,
    pub exclude_communities: Vec<String>,
    pub home_slots: Option<u32>,
    pub discover_slots: Option<u32>,
    pub discover_rate: Option<u32>,
    pub follows_rate: Option<u32>,
}

impl FeedOverride {
    /// Drops entries that cannot be real community codes. Override rows are
    /// written by an out-of-process bot, so treat them as untrusted input.
    pub fn sanitized(mut self) -> Self {
        self.include_communities.retain(|c| is_community_code(c));
        self.exclude_communities.retain(|c| is_community_code(c));
        self
    }
}

fn is_community_code(code: &str) -> bool {
    let mut chars = code.chars();
    match chars.next() {
        Some(prefix) if crate::domain::entities::Tier::from_prefix(prefix).is_some() => {
            let rest = chars.as_str();
            !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}
