pub mod schema;

use std::time::Duration;

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

/// Connection pool for the product tables. Any sqlx-supported URL works;
/// SQLite is the default deployment.
#[derive(Clone)]
pub struct Db {
    pub pool: AnyPool,
}

impl Db {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        // Idempotent; safe to call from every test.
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        tracing::info!(backend = backend_name(database_url), "price store connected");
        Ok(Self { pool })
    }

    /// Creates the product tables when missing.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        schema::migrate(&self.pool).await
    }
}

fn backend_name(database_url: &str) -> &str {
    database_url.split(':').next().unwrap_or("unknown")
}
