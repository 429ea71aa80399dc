use crate::domain::entities::{Community, FeedOverride, Item, MembershipRecord, Tier};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

pub(super) fn map_item_row(row: &SqliteRow) -> Result<Item, AppError> {
    let indexed_at: i64 = row.try_get("indexed_at")?;

    Ok(Item {
        uri: row.try_get("uri")?,
        author: row.try_get("author")?,
        indexed_at: DateTime::from_timestamp_millis(indexed_at).unwrap_or_else(Utc::now),
        reply_parent: row.try_get("reply_parent")?,
        score: row.try_get("score")?,
        rank: row.try_get("rank")?,
        gigacluster: row.try_get("f")?,
        supercluster: row.try_get("s")?,
        cluster: row.try_get("c")?,
        galaxy: row.try_get("g")?,
        nebula: row.try_get("e")?,
        constellation: row.try_get("o")?,
    })
}

pub(super) fn map_membership_row(row: &SqliteRow) -> Result<MembershipRecord, AppError> {
    Ok(MembershipRecord {
        user_id: row.try_get("user_id")?,
        gigacluster: row.try_get("f")?,
        supercluster: row.try_get("s")?,
        cluster: row.try_get("c")?,
        galaxy: row.try_get("g")?,
        nebula: row.try_get("e")?,
        constellation: row.try_get("o")?,
    })
}

pub(super) fn map_community_row(row: &SqliteRow) -> Result<Community, AppError> {
    let code: String = row.try_get("code")?;
    let prefix: String = row.try_get("prefix")?;
    let tier = prefix
        .chars()
        .next()
        .and_then(Tier::from_prefix)
        .ok_or_else(|| AppError::Database(format!("community {code} has unknown prefix {prefix}")))?;

    Ok(Community {
        code,
        tier,
        population: row.try_get("population")?,
    })
}

pub(super) fn map_override_row(row: &SqliteRow) -> Result<FeedOverride, AppError> {
    let include_json: String = row.try_get("include_communities")?;
    let exclude_json: String = row.try_get("exclude_communities")?;

    Ok(FeedOverride {
        user_id: row.try_get("user_id")?,
        feed_id: row.try_get("feed_id")?,
        opt_out: row.try_get::<i64, _>("opt_out")? != 0,
        hide_replies: flag(row, "hide_replies")?,
        hide_follows: flag(row, "hide_follows")?,
        include_communities: serde_json::from_str(&include_json)?,
        exclude_communities: serde_json::from_str(&exclude_json)?,
        home_slots: count(row, "home_slots")?,
        discover_slots: count(row, "discover_slots")?,
        discover_rate: count(row, "discover_rate")?,
        follows_rate: count(row, "follows_rate")?,
    })
}

fn flag(row: &SqliteRow, column: &str) -> Result<Option<bool>, AppError> {
    Ok(row.try_get::<Option<i64>, _>(column)?.map(|v| v != 0))
}

fn count(row: &SqliteRow, column: &str) -> Result<Option<u32>, AppError> {
    Ok(row
        .try_get::<Option<i64>, _>(column)?
        .map(|v| v.max(0) as u32))
}
