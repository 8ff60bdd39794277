// ============================================================================
// OLYMPUS CLOUD - DATABASE CONNECTION MANAGEMENT
// ============================================================================
// Module: shared/src/database/connection.rs
// Description: Database connection pool and configuration
// ============================================================================

use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Row};
use std::time::Duration;
use tracing::info;

use super::DbResult;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
    pub test_before_acquire: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/inventory_ledger".to_string()),
            max_connections: 20,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
            test_before_acquire: true,
        }
    }
}

/// Database connection pool wrapper
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    pool: PgPool,
}

impl ConnectionPool {
    /// Create a new connection pool
    pub async fn new(config: DatabaseConfig) -> DbResult<Self> {
        info!(max_connections = config.max_connections, "creating database connection pool");

        let mut pool_options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .test_before_acquire(config.test_before_acquire);

        if let Some(idle_timeout) = config.idle_timeout {
            pool_options = pool_options.idle_timeout(idle_timeout);
        }

        if let Some(max_lifetime) = config.max_lifetime {
            pool_options = pool_options.max_lifetime(max_lifetime);
        }

        let pool = pool_options.connect(&config.database_url).await?;

        info!("database connection pool created");
        Ok(Self { pool })
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get pool statistics (current size)
    pub fn stats(&self) -> u32 {
        self.pool.size()
    }

    /// Check if the pool is closed
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Close the connection pool
    pub fn close(&self) {
        info!("closing database connection pool");
        self.pool.close();
    }

    /// Execute a trivial liveness query
    pub async fn health_check(&self) -> DbResult<bool> {
        let result = sqlx::query("SELECT 1 as health_check")
            .fetch_one(&self.pool)
            .await?;

        let health_value: i32 = result.try_get("health_check")?;
        Ok(health_value == 1)
    }

    /// Begin a transaction. The atomic aggregate+ledger+outbox write
    /// mandated by spec.md §4.2 step 5 is a single transaction opened here.
    pub async fn begin(&self) -> DbResult<sqlx::Transaction<'_, Postgres>> {
        self.pool.begin().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_config_default_has_sane_bounds() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 1);
        assert!(config.test_before_acquire);
    }
}
