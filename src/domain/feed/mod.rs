pub mod cursor;
pub mod follows_mix;
pub mod merge;

pub use cursor::{fresh_seed, Cursor, SENTINEL_RANK, UNDEFINED};
pub use follows_mix::{mix_follows, FollowsMixOutcome};
pub use merge::{dedup_by_author, merge, shuffle_trim};
