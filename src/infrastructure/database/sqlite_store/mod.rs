use super::ConnectionPool;
use crate::domain::entities::Tier;
use crate::shared::error::AppError;

mod communities;
mod follows;
mod items;
mod mapper;
mod overrides;
mod queries;
mod usage;

/// SQLite-backed implementation of every storage port. One struct so a
/// single pool serves all of them.
pub struct SqliteStore {
    pool: ConnectionPool,
}

impl SqliteStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    pub async fn initialize(&self) -> Result<(), AppError> {
        self.pool.migrate().await?;
        Ok(())
    }
}

/// The only place a tier becomes a column name. Kept in lockstep with the
/// community code prefixes.
pub(crate) fn tier_column(tier: Tier) -> &'static str {
    match tier {
        Tier::Gigacluster => "f",
        Tier::Supercluster => "s",
        Tier::Cluster => "c",
        Tier::Galaxy => "g",
        Tier::Nebula => "e",
        Tier::Constellation => "o",
    }
}
