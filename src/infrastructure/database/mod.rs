mod connection_pool;
mod sqlite_store;

pub use connection_pool::ConnectionPool;
pub use sqlite_store::SqliteStore;
