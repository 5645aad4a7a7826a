//! Layered configuration: `config/default.toml` -> `config/{RUN_ENV}.toml` ->
//! `IDENTITY__*` environment variables, mirroring `bidding-service::config`.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub http: HttpConfig,
    pub broker: BrokerConfig,
    pub outbox: OutboxConfig,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_addr")]
    pub addr: String,
}

fn default_http_addr() -> String {
    "0.0.0.0:8081".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    pub url: String,
    #[serde(default = "default_exchange")]
    pub exchange: String,
}

fn default_exchange() -> String {
    "auction.events".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutboxConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_batch_size() -> i64 {
    10
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_lock_timeout_ms() -> u64 {
    3_000
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let run_env = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_env}")).required(false))
            .add_source(config::Environment::default().prefix("IDENTITY").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_config_defaults_to_8081() {
        assert_eq!(default_http_addr(), "0.0.0.0:8081");
    }

    #[test]
    fn outbox_config_matches_documented_defaults() {
        assert_eq!(default_batch_size(), 10);
        assert_eq!(default_poll_interval_ms(), 500);
    }

    #[test]
    fn lock_timeout_defaults_to_3000ms() {
        assert_eq!(default_lock_timeout_ms(), 3_000);
    }
}
