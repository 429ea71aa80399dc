use super::queries::SELECT_FOLLOWS;
use super::SqliteStore;
use crate::application::ports::store::FollowsGraph;
use crate::shared::error::AppError;
use async_trait::async_trait;
use sqlx::Row;

#[async_trait]
impl FollowsGraph for SqliteStore {
    async fn get_follows(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query(SELECT_FOLLOWS)
            .bind(user_id)
            .fetch_all(self.pool.get_pool())
            .await?;

        rows.iter()
            .map(|row| Ok(row.try_get("followed")?))
            .collect()
    }
}
