//! # Tutordesk DB
//!
//! Entity store and database utilities for the Tutordesk API.
//!
//! The rest of the application talks to persistence only through the
//! [`EntityStore`] trait object. Two backends implement it:
//!
//! - [`MemoryStore`]: everything in process memory, used by tests and local runs
//! - [`PostgresStore`]: durable storage through an `sqlx` connection pool
//!
//! # Example
//!
//! ```ignore
//! use tutordesk_config::StoreBackend;
//! use tutordesk_db::connect_store;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = connect_store(&StoreBackend::from_env()).await?;
//!     store.health_check().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use tutordesk_config::StoreBackend;

pub mod store;

pub use sqlx::PgPool;
pub use store::memory::MemoryStore;
pub use store::postgres::PostgresStore;
pub use store::{
    CurriculumStore, EntityStore, LessonStore, StoreError, StoreResult, StudentStore, UserStore,
};

/// Schema migrations, embedded at compile time.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Initializes a PostgreSQL connection pool.
///
/// The returned pool is cheaply cloneable and should be created once during
/// application startup.
pub async fn init_db_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Opens the configured backend. Postgres stores are migrated before use.
pub async fn connect_store(backend: &StoreBackend) -> anyhow::Result<Arc<dyn EntityStore>> {
    let store: Arc<dyn EntityStore> = match backend {
        StoreBackend::Postgres {
            url,
            max_connections,
        } => {
            let pool = init_db_pool(url, *max_connections).await?;
            MIGRATOR.run(&pool).await?;
            Arc::new(PostgresStore::new(pool))
        }
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };

    info!(backend = store.backend_name(), "Entity store ready");
    Ok(store)
}
