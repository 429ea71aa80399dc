use crate::domain::entities::Item;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

pub struct FollowsMixOutcome {
    pub items: Vec<Item>,
    /// Timestamp of the oldest follows item actually consumed; the next page
    /// fetches strictly older follows content than this.
    pub boundary: Option<DateTime<Utc>>,
}

/// Replaces every `rate`-th slot of the ranked page with the next
/// chronological follows item. The injection offset follows the session seed,
/// except that slot 0 is never replaced (a follows post pinned to the top of
/// every page reads as sticky). Candidates already present in the page are
/// skipped rather than delivered twice.
pub fn mix_follows(base: Vec<Item>, follows: Vec<Item>, rate: u32, seed: u64) -> FollowsMixOutcome {
    if follows.is_empty() || base.is_empty() {
        return FollowsMixOutcome {
            items: base,
            boundary: None,
        };
    }

    let rate = rate.max(1) as u64;
    let offset = seed % rate;
    let seen: HashSet<String> = base.iter().map(|item| item.uri.clone()).collect();

    let mut items = base;
    let mut boundary = None;
    let mut follows = follows
        .into_iter()
        .filter(|candidate| !seen.contains(&candidate.uri));

    let mut next = follows.next();
    for i in 0..items.len() {
        let Some(candidate) = next.take() else { break };
        if i != 0 && i as u64 % rate == offset {
            boundary = Some(candidate.indexed_at);
            items[i] = candidate;
            next = follows.next();
        } else {
            next = Some(candidate);
        }
    }

    FollowsMixOutcome { items, boundary }
}
