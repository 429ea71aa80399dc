use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A candidate feed item. Community codes are denormalized onto the item by
/// the ingester so retrieval can filter without joins; `score` is the
/// popularity counter it maintains (monotonically non-decreasing between
/// pruning runs). `rank` is filled in by retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub uri: String,
    pub author: String,
    pub indexed_at: DateTime<Utc>,
    pub reply_parent: Option<String>,
    pub score: i64,
    pub rank: Option<f64>,
    pub gigacluster: Option<String>,
    pub supercluster: Option<String>,
    pub cluster: Option<String>,
    pub galaxy: Option<String>,
    pub nebula: Option<String>,
    pub constellation: Option<String>,
}

impl Item {
    pub fn is_reply(&self) -> bool {
        self.reply_parent.is_some()
    }
}

/// What a feed response carries per item: an opaque identifier. Content
/// hydration is the consumer's job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedItemRef {
    pub uri: String,
}
