use chrono::{DateTime, Utc};
use orbitfeed::domain::feed::cursor::{Cursor, SENTINEL_RANK};
use orbitfeed::{
    build_orchestrator, init_logging, ConnectionPool, FeedDefinition, FeedOrchestrator,
    FeedRequest, SqliteStore,
};
use sqlx::Row;
use std::collections::HashSet;
use std::sync::Arc;

const ALICE: &str = "did:example:alice";

async fn setup() -> (ConnectionPool, FeedOrchestrator) {
    init_logging();
    let pool = ConnectionPool::from_memory().await.expect("pool");
    let store = Arc::new(SqliteStore::new(pool.clone()));
    store.initialize().await.expect("migrations");
    let orchestrator = build_orchestrator(store, FeedDefinition::default());
    (pool, orchestrator)
}

async fn insert_item(
    pool: &ConnectionPool,
    uri: &str,
    author: &str,
    nebula: Option<&str>,
    indexed_at: DateTime<Utc>,
    score: i64,
) {
    sqlx::query("INSERT INTO items (uri, author, reply_parent, indexed_at, e) VALUES (?1, ?2, NULL, ?3, ?4)")
        .bind(uri)
        .bind(author)
        .bind(indexed_at.timestamp_millis())
        .bind(nebula)
        .execute(pool.get_pool())
        .await
        .expect("insert item");
    sqlx::query("INSERT INTO item_scores (uri, score) VALUES (?1, ?2)")
        .bind(uri)
        .bind(score)
        .execute(pool.get_pool())
        .await
        .expect("insert score");
}

async fn insert_membership(pool: &ConnectionPool, user_id: &str, nebula: &str) {
    sqlx::query("INSERT INTO memberships (user_id, e) VALUES (?1, ?2)")
        .bind(user_id)
        .bind(nebula)
        .execute(pool.get_pool())
        .await
        .expect("insert membership");
}

async fn insert_community(pool: &ConnectionPool, code: &str, population: i64) {
    sqlx::query("INSERT INTO communities (code, prefix, population) VALUES (?1, ?2, ?3)")
        .bind(code)
        .bind(&code[..1])
        .bind(population)
        .execute(pool.get_pool())
        .await
        .expect("insert community");
}

/// A fresh window of home-community posts by distinct authors.
async fn seed_home_items(pool: &ConnectionPool, count: usize) {
    let now = Utc::now();
    for i in 0..count {
        insert_item(
            pool,
            &format!("at://item/{i}"),
            &format!("did:example:author{i}"),
            Some("e10"),
            now - chrono::Duration::minutes(i as i64 + 1),
            5,
        )
        .await;
    }
}

fn request(limit: u32, cursor: Option<&str>) -> FeedRequest {
    FeedRequest {
        user_id: ALICE.to_string(),
        limit,
        cursor: cursor.map(str::to_string),
    }
}

#[tokio::test]
async fn first_page_serves_home_community_items_with_sentinel_cursor() {
    let (pool, orchestrator) = setup().await;
    insert_membership(&pool, ALICE, "e10").await;
    insert_community(&pool, "e10", 8000).await;
    seed_home_items(&pool, 12).await;

    let page = orchestrator
        .handle(request(5, Some("1::undefined::undefined::undefined")))
        .await
        .expect("first page");

    assert_eq!(page.items.len(), 5);
    for item in &page.items {
        assert!(item.uri.starts_with("at://item/"), "unexpected {}", item.uri);
    }

    let cursor = Cursor::decode(&page.cursor).expect("cursor");
    assert_eq!(cursor.seed, 1);
    assert_eq!(cursor.home.as_deref(), Some(SENTINEL_RANK));
    assert_eq!(cursor.discover.as_deref(), Some(SENTINEL_RANK));
}

#[tokio::test]
async fn continuation_pages_never_repeat_items() {
    let (pool, orchestrator) = setup().await;
    insert_membership(&pool, ALICE, "e10").await;
    insert_community(&pool, "e10", 8000).await;
    seed_home_items(&pool, 30).await;

    let page2 = orchestrator
        .handle(request(5, Some(&format!("3::{SENTINEL_RANK}::{SENTINEL_RANK}::undefined"))))
        .await
        .expect("page 2");
    assert!(!page2.items.is_empty());

    let page3 = orchestrator
        .handle(request(5, Some(&page2.cursor)))
        .await
        .expect("page 3");

    let seen: HashSet<&str> = page2.items.iter().map(|i| i.uri.as_str()).collect();
    for item in &page3.items {
        assert!(!seen.contains(item.uri.as_str()), "{} repeated", item.uri);
    }

    // Rank boundaries only ever move down.
    let c2 = Cursor::decode(&page2.cursor).expect("cursor 2");
    let c3 = Cursor::decode(&page3.cursor).expect("cursor 3");
    let rank = |c: &Option<String>| c.as_deref().unwrap().parse::<f64>().unwrap();
    assert!(rank(&c3.home) <= rank(&c2.home));
}

#[tokio::test]
async fn excluded_communities_are_filtered_out() {
    let (pool, orchestrator) = setup().await;
    insert_membership(&pool, ALICE, "e10").await;
    insert_community(&pool, "e10", 8000).await;
    seed_home_items(&pool, 8).await;

    let now = Utc::now();
    for i in 0..8 {
        insert_item(
            &pool,
            &format!("at://blocked/{i}"),
            &format!("did:example:blocked{i}"),
            Some("e20"),
            now - chrono::Duration::minutes(i + 1),
            9,
        )
        .await;
    }
    // e20 would enter through the liked-communities signal without the
    // exclusion.
    insert_membership(&pool, "did:example:bob", "e20").await;
    sqlx::query("INSERT INTO affinity (user_id, subject, score) VALUES (?1, ?2, 10)")
        .bind(ALICE)
        .bind("did:example:bob")
        .execute(pool.get_pool())
        .await
        .expect("insert affinity");
    sqlx::query(
        "INSERT INTO feed_overrides (user_id, feed_id, exclude_communities) VALUES (?1, ?2, ?3)",
    )
    .bind(ALICE)
    .bind("nebula_plus")
    .bind(r#"["e20"]"#)
    .execute(pool.get_pool())
    .await
    .expect("insert override");

    let page = orchestrator
        .handle(request(10, Some("2::undefined::undefined::undefined")))
        .await
        .expect("page");

    assert!(!page.items.is_empty());
    for item in &page.items {
        assert!(
            !item.uri.starts_with("at://blocked/"),
            "excluded item {} leaked",
            item.uri
        );
    }
}

#[tokio::test]
async fn follows_posts_are_woven_into_the_page() {
    let (pool, orchestrator) = setup().await;
    insert_membership(&pool, ALICE, "e10").await;
    insert_community(&pool, "e10", 8000).await;
    seed_home_items(&pool, 10).await;

    sqlx::query("INSERT INTO follows (follower, followed) VALUES (?1, ?2)")
        .bind(ALICE)
        .bind("did:example:carol")
        .execute(pool.get_pool())
        .await
        .expect("insert follow");
    // Carol posts outside every eligible community; she reaches the page
    // through the follows weave only.
    insert_item(
        &pool,
        "at://carol/1",
        "did:example:carol",
        Some("e99"),
        Utc::now() - chrono::Duration::minutes(2),
        1,
    )
    .await;

    let page = orchestrator
        .handle(request(5, Some("7::undefined::undefined::undefined")))
        .await
        .expect("page");

    let uris: Vec<&str> = page.items.iter().map(|i| i.uri.as_str()).collect();
    assert!(uris.contains(&"at://carol/1"), "follows post missing: {uris:?}");

    let cursor = Cursor::decode(&page.cursor).expect("cursor");
    let boundary = cursor.follows.expect("follows boundary");
    assert!(DateTime::parse_from_rfc3339(&boundary).is_ok());
}

#[tokio::test]
async fn liked_communities_reach_the_page_without_a_membership_row() {
    let (pool, orchestrator) = setup().await;
    // Alice has no membership, so home falls back to the default community
    // at another tier; her affinity signal alone must still surface e20.
    insert_membership(&pool, "did:example:bob", "e20").await;
    sqlx::query("INSERT INTO affinity (user_id, subject, score) VALUES (?1, ?2, 10)")
        .bind(ALICE)
        .bind("did:example:bob")
        .execute(pool.get_pool())
        .await
        .expect("insert affinity");

    let now = Utc::now();
    for i in 0..6 {
        insert_item(
            &pool,
            &format!("at://liked/{i}"),
            &format!("did:example:poster{i}"),
            Some("e20"),
            now - chrono::Duration::minutes(i + 1),
            9,
        )
        .await;
    }

    let page = orchestrator
        .handle(request(5, Some("2::undefined::undefined::undefined")))
        .await
        .expect("page");

    assert!(!page.items.is_empty(), "liked-community items missing");
    for item in &page.items {
        assert!(item.uri.starts_with("at://liked/"), "unexpected {}", item.uri);
    }
}

#[tokio::test]
async fn usage_is_recorded_per_request_shape() {
    let (pool, orchestrator) = setup().await;
    insert_membership(&pool, ALICE, "e10").await;
    seed_home_items(&pool, 6).await;

    let first = request(5, Some("4::undefined::undefined::undefined"));
    orchestrator.handle(first.clone()).await.expect("request 1");
    orchestrator.handle(first).await.expect("request 2");

    let row = sqlx::query(
        "SELECT refresh_count, last_output FROM feed_usage WHERE user_id = ?1 AND feed_id = ?2 AND req_limit = 5",
    )
    .bind(ALICE)
    .bind("nebula_plus")
    .fetch_one(pool.get_pool())
    .await
    .expect("usage row");

    assert_eq!(row.get::<i64, _>("refresh_count"), 2);
    assert_eq!(row.get::<i64, _>("last_output"), 5);
}

#[tokio::test]
async fn malformed_cursor_fails_and_is_recorded_as_degraded() {
    let (pool, orchestrator) = setup().await;

    let err = orchestrator
        .handle(request(5, Some("garbage")))
        .await
        .expect_err("malformed cursor");
    assert!(err.is_client_error());

    let row = sqlx::query("SELECT last_output FROM feed_usage WHERE user_id = ?1")
        .bind(ALICE)
        .fetch_one(pool.get_pool())
        .await
        .expect("usage row");
    assert_eq!(row.get::<i64, _>("last_output"), -1);
}

#[tokio::test]
async fn unknown_user_still_gets_a_page_from_the_default_community() {
    let (pool, orchestrator) = setup().await;
    let now = Utc::now();
    for i in 0..6 {
        sqlx::query(
            "INSERT INTO items (uri, author, reply_parent, indexed_at, s) VALUES (?1, ?2, NULL, ?3, 's100')",
        )
        .bind(format!("at://fallback/{i}"))
        .bind(format!("did:example:writer{i}"))
        .bind((now - chrono::Duration::minutes(i + 1)).timestamp_millis())
        .execute(pool.get_pool())
        .await
        .expect("insert item");
        sqlx::query("INSERT INTO item_scores (uri, score) VALUES (?1, 4)")
            .bind(format!("at://fallback/{i}"))
            .execute(pool.get_pool())
            .await
            .expect("insert score");
    }

    let page = orchestrator
        .handle(request(5, Some("6::undefined::undefined::undefined")))
        .await
        .expect("page");

    assert!(!page.items.is_empty());
    for item in &page.items {
        assert!(item.uri.starts_with("at://fallback/"));
    }
}

#[tokio::test]
async fn file_backed_pool_migrates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite:{}/feed.db?mode=rwc", dir.path().display());

    let config = orbitfeed::shared::config::DatabaseConfig {
        url,
        max_connections: 2,
        connection_timeout: 5,
    };
    let pool = ConnectionPool::from_config(&config).await.expect("pool");
    let store = SqliteStore::new(pool.clone());
    store.initialize().await.expect("migrations");

    let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM items")
        .fetch_one(pool.get_pool())
        .await
        .expect("query")
        .get("n");
    assert_eq!(count, 0);
    pool.close().await;
}
