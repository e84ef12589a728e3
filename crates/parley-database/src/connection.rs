//! PostgreSQL pool for the user, friendship, and message tables.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{debug, info};

use parley_core::config::DatabaseConfig;
use parley_core::error::{AppError, ErrorKind};
use parley_core::result::AppResult;

use crate::store::StoreHealth;

/// Shared pool handed to the Parley repositories.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
    target: String,
}

impl DatabasePool {
    /// Opens the pool. Every connection identifies itself with
    /// `config.application_name` so Parley sessions show up by name in
    /// `pg_stat_activity`.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let options = connect_options(config)?;
        let target = describe(&options);
        info!(
            target_db = %target,
            application_name = %config.application_name,
            max_connections = config.max_connections,
            "Opening PostgreSQL pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to open pool to {target}: {e}"),
                    e,
                )
            })?;

        info!(target_db = %target, size = pool.size(), "PostgreSQL pool ready");
        Ok(Self { pool, target })
    }

    /// Return a reference to the underlying sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!(target_db = %self.target, "PostgreSQL pool closed");
    }
}

#[async_trait]
impl StoreHealth for DatabasePool {
    async fn health_check(&self) -> AppResult<bool> {
        let one = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))?;
        debug!(
            size = self.pool.size(),
            idle = self.pool.num_idle(),
            "PostgreSQL pool answered health check"
        );
        Ok(one == 1)
    }
}

/// Parses the configured URL and applies the Parley session settings.
fn connect_options(config: &DatabaseConfig) -> AppResult<PgConnectOptions> {
    let options = PgConnectOptions::from_str(&config.url)
        .map_err(|e| AppError::configuration(format!("Invalid database URL: {e}")))?;
    Ok(options.application_name(&config.application_name))
}

/// `user@host:port/database`, never including the password.
fn describe(options: &PgConnectOptions) -> String {
    format!(
        "{}@{}:{}/{}",
        options.get_username(),
        options.get_host(),
        options.get_port(),
        options.get_database().unwrap_or("-")
    )
}
