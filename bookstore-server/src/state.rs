//! Application state

use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::auth::JwtKeys;
use crate::auth::rate_limit::RateLimiter;
use crate::config::Config;
use crate::storage::{ImageStore, LocalImageStore};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// Token signing keys
    pub jwt: JwtKeys,
    /// Where uploaded images go
    pub images: Arc<dyn ImageStore>,
    /// Rate limiter for login/registration routes
    pub rate_limiter: RateLimiter,
    /// Public origin used in verification links
    pub public_origin: String,
}

impl AppState {
    /// Connect, migrate and build the state
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        tokio::fs::create_dir_all(&config.upload_dir).await?;

        Ok(Self::with_pool(pool, config))
    }

    fn with_pool(pool: PgPool, config: &Config) -> Self {
        Self {
            pool,
            jwt: JwtKeys::from_config(config),
            images: Arc::new(LocalImageStore::new(
                config.upload_dir.clone(),
                &config.public_base_url,
            )),
            rate_limiter: RateLimiter::new(&config.trusted_proxies),
            public_origin: config
                .cors_origins
                .first()
                .cloned()
                .unwrap_or_else(|| format!("http://localhost:{}", config.http_port)),
        }
    }
}

#[cfg(test)]
impl AppState {
    /// State whose pool never connects unless a query is run
    pub fn for_tests(config: &Config) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy(&config.database_url)
            .unwrap();
        Self::with_pool(pool, config)
    }
}
