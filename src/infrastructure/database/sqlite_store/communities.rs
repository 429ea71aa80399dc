use super::mapper::{map_community_row, map_membership_row};
use super::queries::SELECT_MEMBERSHIP;
use super::{tier_column, SqliteStore};
use crate::application::ports::store::CommunityStore;
use crate::domain::entities::{Community, LikedCommunity, MembershipRecord, Tier};
use crate::shared::error::AppError;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite};

#[async_trait]
impl CommunityStore for SqliteStore {
    async fn get_membership(&self, user_id: &str) -> Result<Option<MembershipRecord>, AppError> {
        let row = sqlx::query(SELECT_MEMBERSHIP)
            .bind(user_id)
            .fetch_optional(self.pool.get_pool())
            .await?;

        match row {
            Some(row) => Ok(Some(map_membership_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_communities(&self, codes: &[String]) -> Result<Vec<Community>, AppError> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT code, prefix, population FROM communities WHERE code IN (");
        let mut separated = builder.separated(", ");
        for code in codes {
            separated.push_bind(code.clone());
        }
        builder.push(")");

        let rows = builder.build().fetch_all(self.pool.get_pool()).await?;
        rows.iter().map(map_community_row).collect()
    }

    async fn top_liked_communities(
        &self,
        user_id: &str,
        tier: Tier,
        home: &str,
        exclude: &[String],
        limit: u32,
    ) -> Result<Vec<LikedCommunity>, AppError> {
        let column = tier_column(tier);

        // The bare `a.subject` resolves to the row carrying MAX(a.score), so
        // each liked community comes back with its strongest contributor as
        // the trusted-friends hop subject.
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT m.{column} AS community, a.subject AS subject, \
                    SUM(a.score) AS weight, MAX(a.score) AS strongest \
             FROM affinity a \
             JOIN memberships m ON m.user_id = a.subject \
             WHERE a.user_id = "
        ));
        builder.push_bind(user_id.to_string());
        builder.push(format!(" AND m.{column} IS NOT NULL AND m.{column} <> "));
        builder.push_bind(home.to_string());
        push_not_in(&mut builder, column, exclude);
        builder.push(format!(
            " GROUP BY m.{column} ORDER BY weight DESC, community ASC LIMIT "
        ));
        builder.push_bind(limit as i64);

        let rows = builder.build().fetch_all(self.pool.get_pool()).await?;
        rows.iter()
            .map(|row| {
                Ok(LikedCommunity {
                    community: row.try_get("community")?,
                    subject: row.try_get("subject")?,
                })
            })
            .collect()
    }

    async fn trusted_friends_communities(
        &self,
        subjects: &[String],
        tier: Tier,
        home: &str,
        already_selected: &[String],
        exclude: &[String],
        limit: u32,
    ) -> Result<Vec<String>, AppError> {
        if subjects.is_empty() {
            return Ok(Vec::new());
        }
        let column = tier_column(tier);

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT m.{column} AS community, SUM(a.score) AS weight \
             FROM affinity a \
             JOIN memberships m ON m.user_id = a.subject \
             WHERE a.user_id IN ("
        ));
        let mut separated = builder.separated(", ");
        for subject in subjects {
            separated.push_bind(subject.clone());
        }
        builder.push(")");
        builder.push(format!(" AND m.{column} IS NOT NULL AND m.{column} <> "));
        builder.push_bind(home.to_string());

        let skip: Vec<String> = already_selected
            .iter()
            .chain(exclude.iter())
            .cloned()
            .collect();
        push_not_in(&mut builder, column, &skip);

        builder.push(format!(
            " GROUP BY m.{column} ORDER BY weight DESC, community ASC LIMIT "
        ));
        builder.push_bind(limit as i64);

        let rows = builder.build().fetch_all(self.pool.get_pool()).await?;
        rows.iter()
            .map(|row| Ok(row.try_get("community")?))
            .collect()
    }
}

fn push_not_in(builder: &mut QueryBuilder<'_, Sqlite>, column: &str, codes: &[String]) {
    if codes.is_empty() {
        return;
    }
    builder.push(format!(" AND m.{column} NOT IN ("));
    let mut separated = builder.separated(", ");
    for code in codes {
        separated.push_bind(code.clone());
    }
    builder.push(")");
}
