//! Database connection pool management for the auction platform's services.
//!
//! Provides unified pool creation/configuration plus the [`TransactionManager`] that
//! every mutating repository call is built on.

mod metrics;
mod transaction;

pub use metrics::acquire_with_metrics;
use metrics::update_pool_metrics;
pub use transaction::{StoreError, StoreResult, Tx, TransactionManager};

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

/// Database connection pool configuration.
#[derive(Clone)]
pub struct DbConfig {
    pub service_name: String,
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("service_name", &self.service_name)
            .field("database_url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            service_name: String::from("unknown"),
            database_url: String::new(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout_secs: 5,
            acquire_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl DbConfig {
    pub fn from_env(service_name: &str) -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable not set".to_string())?;

        Ok(Self {
            service_name: service_name.to_string(),
            database_url,
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 2),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 5),
            acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 600),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
        })
    }

    /// Pool sizing tuned per service. The bidding service takes the brunt of
    /// concurrent writers (sniping storms on hot items), the relay/consumer services
    /// are comparatively light since each holds one connection per worker.
    pub fn for_service(service_name: &str) -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/auction".to_string());

        let (max, min) = match service_name {
            "bidding-service" => (20, 5),
            "identity-service" => (8, 2),
            "analytics-service" => (8, 2),
            _ => (5, 1),
        };

        Self {
            service_name: service_name.to_string(),
            database_url,
            max_connections: env_or("DB_MAX_CONNECTIONS", max),
            min_connections: env_or("DB_MIN_CONNECTIONS", min),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 5),
            acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 600),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
        }
    }

    pub fn log_config(&self) {
        info!(
            service = %self.service_name,
            max_connections = self.max_connections,
            min_connections = self.min_connections,
            acquire_timeout_secs = self.acquire_timeout_secs,
            "database pool configuration"
        );
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Create a PostgreSQL connection pool with automatic metrics monitoring.
pub async fn create_pool(config: DbConfig) -> Result<PgPool, sqlx::Error> {
    debug!(service = %config.service_name, "creating database pool");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
        .connect(&config.database_url)
        .await?;

    match tokio::time::timeout(
        Duration::from_secs(config.connect_timeout_secs),
        sqlx::query("SELECT 1").execute(&pool),
    )
    .await
    {
        Ok(Ok(_)) => {
            info!(service = %config.service_name, "database pool created and verified");
            update_pool_metrics(&pool, &config.service_name);

            let pool_clone = pool.clone();
            let service = config.service_name.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(30));
                loop {
                    interval.tick().await;
                    update_pool_metrics(&pool_clone, &service);
                }
            });

            Ok(pool)
        }
        Ok(Err(e)) => {
            error!(service = %config.service_name, error = %e, "database connection verification failed");
            Err(e)
        }
        Err(_) => {
            error!(service = %config.service_name, "database connection verification timed out");
            Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "database verification timeout",
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn default_config_matches_documented_defaults() {
        std::env::remove_var("DB_MAX_CONNECTIONS");
        std::env::remove_var("DB_MIN_CONNECTIONS");

        let config = DbConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
    }

    #[test]
    #[serial_test::serial]
    fn for_service_sizes_bidding_service_largest() {
        std::env::remove_var("DB_MAX_CONNECTIONS");
        std::env::remove_var("DB_MIN_CONNECTIONS");

        assert_eq!(DbConfig::for_service("bidding-service").max_connections, 20);
        assert_eq!(DbConfig::for_service("identity-service").max_connections, 8);
        assert_eq!(DbConfig::for_service("analytics-service").max_connections, 8);
        assert_eq!(DbConfig::for_service("unknown-service").max_connections, 5);
    }

    #[test]
    #[serial_test::serial]
    fn env_override_takes_precedence() {
        std::env::remove_var("DB_MAX_CONNECTIONS");
        std::env::set_var("DB_MAX_CONNECTIONS", "100");

        let config = DbConfig::for_service("bidding-service");
        assert_eq!(config.max_connections, 100);

        std::env::remove_var("DB_MAX_CONNECTIONS");
    }
}
