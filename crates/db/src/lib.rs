//! Record store access for the workflow catalog.
//!
//! - [`RecordStore`]: the read-only query/count/aggregate seam.
//! - [`PgRecordStore`]: PostgreSQL adapter over the generic `records` table
//!   created by `migrations/`.
//! - [`MemoryRecordStore`]: in-process adapter with fault injection, used by
//!   tests and fixture-driven dry runs.

use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod memory;
pub mod pg;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryRecordStore;
pub use pg::PgRecordStore;
pub use store::{Aggregate, Filter, OrderBy, Query, Record, RecordStore};

pub type DbPool = sqlx::PgPool;

/// Default maximum number of pooled connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Create a connection pool from a database URL.
///
/// `max_connections` is the only concurrency limit applied to store calls;
/// concurrent enrichment tasks queue on the pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}
