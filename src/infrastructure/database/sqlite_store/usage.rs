use super::queries::UPSERT_FEED_USAGE;
use super::SqliteStore;
use crate::application::ports::store::UsageRecorder;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;

#[async_trait]
impl UsageRecorder for SqliteStore {
    async fn record_usage(
        &self,
        user_id: &str,
        feed_id: &str,
        limit: u32,
        output_count: i64,
    ) -> Result<(), AppError> {
        sqlx::query(UPSERT_FEED_USAGE)
            .bind(user_id)
            .bind(feed_id)
            .bind(limit as i64)
            .bind(output_count)
            .bind(Utc::now().timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;

        Ok(())
    }
}
