pub(super) const SELECT_MEMBERSHIP: &str = r#"
    SELECT user_id, f, s, c, g, e, o
    FROM memberships
    WHERE user_id = ?1
"#;

pub(super) const SELECT_OVERRIDE: &str = r#"
    SELECT user_id,
           feed_id,
           opt_out,
           hide_replies,
           hide_follows,
           include_communities,
           exclude_communities,
           home_slots,
           discover_slots,
           discover_rate,
           follows_rate
    FROM feed_overrides
    WHERE user_id = ?1 AND feed_id = ?2
"#;

pub(super) const SELECT_FOLLOWS: &str = r#"
    SELECT followed
    FROM follows
    WHERE follower = ?1
"#;

pub(super) const UPSERT_FEED_USAGE: &str = r#"
    INSERT INTO feed_usage (user_id, feed_id, req_limit, refresh_count, last_output, updated_at)
    VALUES (?1, ?2, ?3, 1, ?4, ?5)
    ON CONFLICT(user_id, feed_id, req_limit) DO UPDATE SET
        refresh_count = refresh_count + 1,
        last_output = excluded.last_output,
        updated_at = excluded.updated_at
"#;
