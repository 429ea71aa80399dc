use super::mapper::map_override_row;
use super::queries::SELECT_OVERRIDE;
use super::SqliteStore;
use crate::application::ports::store::OverrideStore;
use crate::domain::entities::FeedOverride;
use crate::shared::error::AppError;
use async_trait::async_trait;

#[async_trait]
impl OverrideStore for SqliteStore {
    async fn get_override(
        &self,
        user_id: &str,
        feed_id: &str,
    ) -> Result<Option<FeedOverride>, AppError> {
        let row = sqlx::query(SELECT_OVERRIDE)
            .bind(user_id)
            .bind(feed_id)
            .fetch_optional(self.pool.get_pool())
            .await?;

        match row {
            Some(row) => Ok(Some(map_override_row(&row)?)),
            None => Ok(None),
        }
    }
}
