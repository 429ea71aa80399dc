use super::mapper::map_item_row;
use super::{tier_column, SqliteStore};
use crate::application::ports::store::{
    CommunityFilter, CommunityPredicate, ItemStore, RankedMode, RankedQuery,
};
use crate::domain::entities::Item;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

const ITEM_COLUMNS: &str = "uri, author, reply_parent, indexed_at, score, rank, f, s, c, g, e, o";

#[async_trait]
impl ItemStore for SqliteStore {
    async fn query_ranked(
        &self,
        filter: &CommunityFilter,
        query: &RankedQuery,
    ) -> Result<Vec<Item>, AppError> {
        let now_ms = query.now.timestamp_millis();

        // Rank is computed inside the subselect so the outer WHERE can bound
        // it directly; `now` is a bound parameter, never wall clock in SQL.
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {ITEM_COLUMNS} FROM ( \
               SELECT i.uri, i.author, i.reply_parent, i.indexed_at, \
                      COALESCE(sc.score, 0) AS score, \
                      CAST(COALESCE(sc.score, 0) - 1 AS REAL) / pow(("
        ));
        builder.push_bind(now_ms);
        builder.push(" - i.indexed_at) / 3600000.0 + 2.0, ");
        builder.push_bind(query.gravity);
        builder.push(
            ") AS rank, i.f, i.s, i.c, i.g, i.e, i.o \
             FROM items i LEFT JOIN item_scores sc ON sc.uri = i.uri \
             ) WHERE ",
        );
        push_filter(&mut builder, filter);

        match query.mode {
            RankedMode::FirstPage {
                window_hours,
                min_quality,
            } => {
                builder.push(" AND indexed_at > ");
                builder.push_bind(now_ms - window_hours * 3_600_000);
                builder.push(" AND score >= ");
                builder.push_bind(min_quality);
            }
            RankedMode::Continuation { max_rank } => {
                builder.push(" AND rank < ");
                builder.push_bind(max_rank);
            }
        }
        if query.skip_replies {
            builder.push(" AND reply_parent IS NULL");
        }
        builder.push(" ORDER BY rank DESC, uri ASC LIMIT ");
        builder.push_bind(query.limit as i64);

        let rows = builder.build().fetch_all(self.pool.get_pool()).await?;
        rows.iter().map(map_item_row).collect()
    }

    async fn chronological_by_authors(
        &self,
        authors: &[String],
        before: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<Item>, AppError> {
        if authors.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT i.uri, i.author, i.reply_parent, i.indexed_at, \
                    COALESCE(sc.score, 0) AS score, NULL AS rank, \
                    i.f, i.s, i.c, i.g, i.e, i.o \
             FROM items i LEFT JOIN item_scores sc ON sc.uri = i.uri \
             WHERE i.reply_parent IS NULL AND i.author IN (",
        );
        let mut separated = builder.separated(", ");
        for author in authors {
            separated.push_bind(author.clone());
        }
        builder.push(")");

        if let Some(before) = before {
            builder.push(" AND i.indexed_at < ");
            builder.push_bind(before.timestamp_millis());
        }
        builder.push(" ORDER BY i.indexed_at DESC LIMIT ");
        builder.push_bind(limit as i64);

        let rows = builder.build().fetch_all(self.pool.get_pool()).await?;
        rows.iter().map(map_item_row).collect()
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &CommunityFilter) {
    if filter.any_of.is_empty() {
        // No eligible communities at all: match nothing rather than
        // everything.
        builder.push("0 = 1");
    } else {
        builder.push("(");
        for (i, predicate) in filter.any_of.iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            push_predicate(builder, predicate);
        }
        builder.push(")");
    }

    for predicate in &filter.all_of {
        builder.push(" AND ");
        push_predicate(builder, predicate);
    }
}

fn push_predicate(builder: &mut QueryBuilder<'_, Sqlite>, predicate: &CommunityPredicate) {
    match predicate {
        CommunityPredicate::Equals(tier, code) => {
            builder.push(tier_column(*tier));
            builder.push(" = ");
            builder.push_bind(code.clone());
        }
        CommunityPredicate::InSet(tier, codes) => {
            if codes.is_empty() {
                builder.push("0 = 1");
                return;
            }
            builder.push(tier_column(*tier));
            builder.push(" IN (");
            let mut separated = builder.separated(", ");
            for code in codes {
                separated.push_bind(code.clone());
            }
            builder.push(")");
        }
        CommunityPredicate::NotInSet(tier, codes) => {
            if codes.is_empty() {
                builder.push("1 = 1");
                return;
            }
            // NULL means "not assigned at this tier", which is not a match
            // for the excluded set.
            let column = tier_column(*tier);
            builder.push("(");
            builder.push(column);
            builder.push(" IS NULL OR ");
            builder.push(column);
            builder.push(" NOT IN (");
            let mut separated = builder.separated(", ");
            for code in codes {
                separated.push_bind(code.clone());
            }
            builder.push("))");
        }
    }
}
