use crate::application::ports::store::{OverrideStore, UsageRecorder};
use crate::application::services::community_selector::CommunitySelector;
use crate::application::services::feed_definition::{EffectiveFeedConfig, FeedDefinition};
use crate::application::services::follows_injector::FollowsInjector;
use crate::application::services::ranked_retriever::{
    FirstPageOptions, RankedRetriever, StreamOptions,
};
use crate::domain::entities::{FeedItemRef, Item};
use crate::domain::feed::cursor::{fresh_seed, Cursor, SENTINEL_RANK};
use crate::domain::feed::merge::{dedup_by_author, merge, shuffle_trim};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::warn;

pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub user_id: String,
    pub limit: u32,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FeedPage {
    pub cursor: String,
    pub items: Vec<FeedItemRef>,
}

/// Drives one feed request end to end: cursor handling, override and profile
/// resolution, the two ranked streams, the follows weave, and the usage
/// record. Every fallible step below the cursor decode sits behind a recovery
/// boundary that degrades to an empty restart page instead of failing the
/// request.
pub struct FeedOrchestrator {
    definition: FeedDefinition,
    selector: CommunitySelector,
    retriever: RankedRetriever,
    injector: FollowsInjector,
    overrides: Arc<dyn OverrideStore>,
    usage: Arc<dyn UsageRecorder>,
}

impl FeedOrchestrator {
    pub fn new(
        definition: FeedDefinition,
        selector: CommunitySelector,
        retriever: RankedRetriever,
        injector: FollowsInjector,
        overrides: Arc<dyn OverrideStore>,
        usage: Arc<dyn UsageRecorder>,
    ) -> Self {
        Self {
            definition,
            selector,
            retriever,
            injector,
            overrides,
            usage,
        }
    }

    pub async fn handle(&self, request: FeedRequest) -> Result<FeedPage, AppError> {
        let limit = request.limit.clamp(1, MAX_PAGE_SIZE);

        let cursor = match request.cursor.as_deref() {
            Some(raw) => match Cursor::decode(raw) {
                Ok(cursor) => cursor,
                Err(err) => {
                    self.record(&request.user_id, limit, -1).await;
                    return Err(err);
                }
            },
            None => Cursor::first_page(fresh_seed()),
        };

        match self.compose(&request.user_id, limit, &cursor).await {
            Ok(page) => {
                self.record(&request.user_id, limit, page.items.len() as i64)
                    .await;
                Ok(page)
            }
            Err(err) if err.is_client_error() => {
                self.record(&request.user_id, limit, -1).await;
                Err(err)
            }
            Err(err) => {
                warn!(error = %err, user_id = %request.user_id, "feed composition failed, serving empty page");
                self.record(&request.user_id, limit, -1).await;
                // Boundaries that were known coming in stay on the degraded
                // cursor, so a recovered store resumes instead of
                // re-delivering the session from the top.
                Ok(FeedPage {
                    cursor: cursor.to_string(),
                    items: Vec::new(),
                })
            }
        }
    }

    async fn compose(
        &self,
        user_id: &str,
        limit: u32,
        cursor: &Cursor,
    ) -> Result<FeedPage, AppError> {
        let def = &self.definition;
        let seed = cursor.seed;

        let feed_override = self.overrides.get_override(user_id, &def.feed_id).await?;
        let cfg = def.resolve(feed_override);
        let profile = self.selector.resolve(user_id, &cfg).await?;
        let wide = profile.personalization_insufficient();
        let now = Utc::now();

        let home_profile = profile.sliced(cfg.home_slots);
        let discover_profile = profile.sliced(cfg.discover_slots);
        let mut rng = StdRng::seed_from_u64(seed);

        let (items, home_boundary, discover_boundary) = if cursor.is_continuation() {
            let home_max = parse_rank(cursor.home.as_deref().unwrap_or_default())?;
            let discover_max = parse_rank(cursor.discover.as_deref().unwrap_or_default())?;

            let home_opts = self.stream_options(
                def.home_gravity,
                def.home_skip_replies,
                limit * def.home_lookup_multiplier,
                &cfg,
                wide,
            );
            let discover_opts = self.stream_options(
                def.discover_gravity,
                def.discover_skip_replies,
                limit * def.discover_lookup_multiplier,
                &cfg,
                wide,
            );

            let (home, discover) = tokio::try_join!(
                self.retriever
                    .continuation(&home_profile, &home_opts, home_max, now),
                self.retriever
                    .continuation(&discover_profile, &discover_opts, discover_max, now),
            )?;

            // Boundaries come from the fetched streams, not the trimmed
            // page; an empty fetch carries the incoming boundary forward
            // verbatim so replays stay byte-stable.
            let home_next = next_boundary(&home, cursor.home.as_deref());
            let discover_next = next_boundary(&discover, cursor.discover.as_deref());

            let home = dedup_by_author(home, def.home_randomize_dedup, seed, &mut rng);
            let discover = dedup_by_author(discover, def.discover_randomize_dedup, seed, &mut rng);
            let merged = merge(home, discover, cfg.discover_rate, seed);
            let page = shuffle_trim(merged, limit as usize, seed, false, &mut rng);
            (page, home_next, discover_next)
        } else {
            let first_page = FirstPageOptions {
                seed,
                reply_ratio: def.first_page_reply_ratio,
                min_quality: def.first_page_min_quality,
                window_hours: def.recency_window_hours,
            };
            let home_opts = self.stream_options(
                def.first_page_gravity,
                def.home_skip_replies,
                limit * def.first_page_lookup_multiplier,
                &cfg,
                wide,
            );
            let discover_opts = self.stream_options(
                def.discover_gravity,
                def.discover_skip_replies,
                limit * def.first_page_lookup_multiplier,
                &cfg,
                wide,
            );

            let (home, discover) = tokio::try_join!(
                self.retriever
                    .first_page(&home_profile, &home_opts, &first_page, now),
                self.retriever
                    .first_page(&discover_profile, &discover_opts, &first_page, now),
            )?;

            let home = dedup_by_author(home, def.home_randomize_dedup, seed, &mut rng);
            let discover = dedup_by_author(discover, def.discover_randomize_dedup, seed, &mut rng);
            let merged = merge(home, discover, cfg.discover_rate, seed);
            let page = shuffle_trim(
                merged,
                limit as usize,
                seed,
                def.first_page_randomize_dedup,
                &mut rng,
            );
            (
                page,
                SENTINEL_RANK.to_string(),
                SENTINEL_RANK.to_string(),
            )
        };

        let (items, follows_boundary) = if cfg.hide_follows {
            (items, None)
        } else {
            let rate = if cursor.is_continuation() {
                cfg.follows_rate
            } else {
                cfg.first_page_follows_rate
            };
            let since = cursor
                .follows
                .as_deref()
                .and_then(parse_follows_boundary);
            let outcome = self
                .injector
                .inject(user_id, items, since, rate, seed)
                .await?;
            let boundary = outcome
                .boundary
                .map(|t| t.to_rfc3339())
                .or_else(|| cursor.follows.clone());
            (outcome.items, boundary)
        };

        let next = Cursor {
            seed,
            home: Some(home_boundary),
            discover: Some(discover_boundary),
            follows: follows_boundary,
        };

        Ok(FeedPage {
            cursor: next.to_string(),
            items: items.into_iter().map(|i| FeedItemRef { uri: i.uri }).collect(),
        })
    }

    fn stream_options(
        &self,
        gravity: f64,
        skip_replies: bool,
        limit: u32,
        cfg: &EffectiveFeedConfig,
        wide: bool,
    ) -> StreamOptions {
        StreamOptions {
            gravity,
            skip_replies: skip_replies || cfg.hide_replies,
            limit,
            with_wide_explore: wide,
        }
    }

    /// Usage recording never fails a request.
    async fn record(&self, user_id: &str, limit: u32, output_count: i64) {
        if let Err(err) = self
            .usage
            .record_usage(user_id, &self.definition.feed_id, limit, output_count)
            .await
        {
            warn!(error = %err, "failed to record feed usage");
        }
    }
}

fn parse_rank(raw: &str) -> Result<f64, AppError> {
    raw.parse::<f64>()
        .map_err(|_| AppError::InvalidInput("malformed cursor".to_string()))
}

fn next_boundary(fetched: &[Item], incoming: Option<&str>) -> String {
    fetched
        .last()
        .and_then(|item| item.rank)
        .map(|rank| rank.to_string())
        .or_else(|| incoming.map(str::to_string))
        .unwrap_or_else(|| SENTINEL_RANK.to_string())
}

fn parse_follows_boundary(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::store::{
        CommunityFilter, CommunityStore, FollowsGraph, ItemStore, RankedMode, RankedQuery,
    };
    use crate::domain::entities::{
        Community, FeedOverride, LikedCommunity, MembershipRecord, Tier,
    };
    use async_trait::async_trait;
    use mockall::mock;
    use mockall::predicate::*;

    mock! {
        Communities {}

        #[async_trait]
        impl CommunityStore for Communities {
            async fn get_membership(&self, user_id: &str) -> Result<Option<MembershipRecord>, AppError>;
            async fn get_communities(&self, codes: &[String]) -> Result<Vec<Community>, AppError>;
            async fn top_liked_communities(
                &self,
                user_id: &str,
                tier: Tier,
                home: &str,
                exclude: &[String],
                limit: u32,
            ) -> Result<Vec<LikedCommunity>, AppError>;
            async fn trusted_friends_communities(
                &self,
                subjects: &[String],
                tier: Tier,
                home: &str,
                already_selected: &[String],
                exclude: &[String],
                limit: u32,
            ) -> Result<Vec<String>, AppError>;
        }
    }

    mock! {
        Items {}

        #[async_trait]
        impl ItemStore for Items {
            async fn query_ranked(
                &self,
                filter: &CommunityFilter,
                query: &RankedQuery,
            ) -> Result<Vec<Item>, AppError>;
            async fn chronological_by_authors(
                &self,
                authors: &[String],
                before: Option<DateTime<Utc>>,
                limit: u32,
            ) -> Result<Vec<Item>, AppError>;
        }
    }

    mock! {
        Overrides {}

        #[async_trait]
        impl OverrideStore for Overrides {
            async fn get_override(
                &self,
                user_id: &str,
                feed_id: &str,
            ) -> Result<Option<FeedOverride>, AppError>;
        }
    }

    mock! {
        Graph {}

        #[async_trait]
        impl FollowsGraph for Graph {
            async fn get_follows(&self, user_id: &str) -> Result<Vec<String>, AppError>;
        }
    }

    mock! {
        Usage {}

        #[async_trait]
        impl UsageRecorder for Usage {
            async fn record_usage(
                &self,
                user_id: &str,
                feed_id: &str,
                limit: u32,
                output_count: i64,
            ) -> Result<(), AppError>;
        }
    }

    fn ranked_item(uri: &str, rank: f64) -> Item {
        Item {
            uri: uri.to_string(),
            author: format!("author-{uri}"),
            indexed_at: Utc::now(),
            reply_parent: None,
            score: 5,
            rank: Some(rank),
            gigacluster: None,
            supercluster: None,
            cluster: None,
            galaxy: None,
            nebula: Some("e10".to_string()),
            constellation: None,
        }
    }

    struct Mocks {
        communities: MockCommunities,
        items: MockItems,
        overrides: MockOverrides,
        graph: MockGraph,
        usage: MockUsage,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                communities: MockCommunities::new(),
                items: MockItems::new(),
                overrides: MockOverrides::new(),
                graph: MockGraph::new(),
                usage: MockUsage::new(),
            }
        }

        /// Happy-path defaults: no membership, no personalization signal,
        /// no override, no follows.
        fn with_baseline(mut self) -> Self {
            self.communities
                .expect_get_membership()
                .returning(|_| Ok(None));
            self.communities
                .expect_top_liked_communities()
                .returning(|_, _, _, _, _| Ok(Vec::new()));
            self.overrides.expect_get_override().returning(|_, _| Ok(None));
            self.graph.expect_get_follows().returning(|_| Ok(Vec::new()));
            self
        }

        fn build(self) -> FeedOrchestrator {
            let items: Arc<dyn ItemStore> = Arc::new(self.items);
            FeedOrchestrator::new(
                FeedDefinition::default(),
                CommunitySelector::new(Arc::new(self.communities)),
                RankedRetriever::new(items.clone()),
                FollowsInjector::new(Arc::new(self.graph), items),
                Arc::new(self.overrides),
                Arc::new(self.usage),
            )
        }
    }

    fn request(cursor: Option<&str>) -> FeedRequest {
        FeedRequest {
            user_id: "did:example:user".to_string(),
            limit: 10,
            cursor: cursor.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn first_page_emits_sentinel_boundaries_and_honors_limit() {
        let mut mocks = Mocks::new().with_baseline();
        mocks.items.expect_query_ranked().times(2).returning(|_, query| {
            assert!(matches!(query.mode, RankedMode::FirstPage { .. }));
            Ok((0..30)
                .map(|i| ranked_item(&format!("p{i}"), 30.0 - i as f64))
                .collect())
        });
        mocks
            .usage
            .expect_record_usage()
            .withf(|_, feed, limit, count| feed == "nebula_plus" && *limit == 10 && *count == 10)
            .returning(|_, _, _, _| Ok(()));

        let page = mocks
            .build()
            .handle(request(Some("5::undefined::undefined::undefined")))
            .await
            .unwrap();

        assert_eq!(page.items.len(), 10);
        let next = Cursor::decode(&page.cursor).unwrap();
        assert_eq!(next.seed, 5);
        assert_eq!(next.home.as_deref(), Some(SENTINEL_RANK));
        assert_eq!(next.discover.as_deref(), Some(SENTINEL_RANK));
        assert!(next.is_continuation());
    }

    #[tokio::test]
    async fn continuation_bounds_streams_and_carries_empty_boundary_verbatim() {
        let mut mocks = Mocks::new().with_baseline();
        mocks.items.expect_query_ranked().times(2).returning(|_, query| {
            match query.mode {
                RankedMode::Continuation { max_rank } if (max_rank - 10.5).abs() < 1e-9 => {
                    Ok(vec![ranked_item("h0", 4.0), ranked_item("h1", 3.25)])
                }
                RankedMode::Continuation { max_rank } if (max_rank - 9.5).abs() < 1e-9 => {
                    Ok(Vec::new())
                }
                _ => panic!("unexpected query mode"),
            }
        });
        mocks
            .usage
            .expect_record_usage()
            .withf(|_, _, _, count| *count == 2)
            .returning(|_, _, _, _| Ok(()));

        let page = mocks
            .build()
            .handle(request(Some("5::10.5::9.5::undefined")))
            .await
            .unwrap();

        assert_eq!(page.items.len(), 2);
        let next = Cursor::decode(&page.cursor).unwrap();
        assert_eq!(next.home.as_deref(), Some("3.25"));
        // Empty discover fetch: the previous boundary survives unchanged.
        assert_eq!(next.discover.as_deref(), Some("9.5"));
    }

    #[tokio::test]
    async fn malformed_cursor_is_rejected_and_recorded() {
        let mut mocks = Mocks::new();
        mocks
            .usage
            .expect_record_usage()
            .withf(|_, _, _, count| *count == -1)
            .returning(|_, _, _, _| Ok(()));

        let err = mocks
            .build()
            .handle(request(Some("not-a-cursor")))
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn store_failure_degrades_to_empty_restart_page() {
        let mut mocks = Mocks::new().with_baseline();
        mocks
            .items
            .expect_query_ranked()
            .returning(|_, _| Err(AppError::Database("no such table: items".to_string())));
        mocks
            .usage
            .expect_record_usage()
            .withf(|_, _, _, count| *count == -1)
            .returning(|_, _, _, _| Ok(()));

        let page = mocks
            .build()
            .handle(request(Some("5::undefined::undefined::undefined")))
            .await
            .unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.cursor, "5::undefined::undefined::undefined");
    }

    #[tokio::test]
    async fn store_failure_on_continuation_keeps_known_boundaries() {
        let mut mocks = Mocks::new().with_baseline();
        mocks
            .items
            .expect_query_ranked()
            .returning(|_, _| Err(AppError::Database("no such table: items".to_string())));
        mocks
            .usage
            .expect_record_usage()
            .withf(|_, _, _, count| *count == -1)
            .returning(|_, _, _, _| Ok(()));

        let page = mocks
            .build()
            .handle(request(Some("5::10.5::9.5::2024-01-01T00:00:00+00:00")))
            .await
            .unwrap();

        assert!(page.items.is_empty());
        // The incoming boundaries survive so the session resumes once the
        // store recovers.
        assert_eq!(page.cursor, "5::10.5::9.5::2024-01-01T00:00:00+00:00");
    }

    #[tokio::test]
    async fn hide_follows_override_skips_the_graph_entirely() {
        let mut mocks = Mocks::new();
        mocks.communities.expect_get_membership().returning(|_| Ok(None));
        mocks
            .communities
            .expect_top_liked_communities()
            .returning(|_, _, _, _, _| Ok(Vec::new()));
        mocks.overrides.expect_get_override().returning(|_, _| {
            Ok(Some(FeedOverride {
                hide_follows: Some(true),
                ..Default::default()
            }))
        });
        mocks.graph.expect_get_follows().never();
        mocks.items.expect_query_ranked().times(2).returning(|_, _| {
            Ok(vec![ranked_item("p0", 2.0), ranked_item("p1", 1.0)])
        });
        mocks
            .usage
            .expect_record_usage()
            .returning(|_, _, _, _| Ok(()));

        let page = mocks
            .build()
            .handle(request(Some("3::undefined::undefined::undefined")))
            .await
            .unwrap();

        let next = Cursor::decode(&page.cursor).unwrap();
        assert_eq!(next.follows, None);
    }
}
