//! Layered configuration: `config/default.toml` → `config/{RUN_ENV}.toml` →
//! `BIDDING__*` environment variables, `.env` loaded first (spec.md §6 config keys).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub http: HttpConfig,
    pub broker: BrokerConfig,
    #[serde(default)]
    pub outbox: OutboxConfig,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_addr")]
    pub addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: default_http_addr(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    pub url: String,
    #[serde(default = "default_exchange")]
    pub exchange: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutboxConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_exchange() -> String {
    "auction.events".to_string()
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
            .add_source(
                config::Environment::default()
                    .prefix("BIDDING")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_config_defaults_to_8080() {
        assert_eq!(HttpConfig::default().addr, "0.0.0.0:8080");
    }

    #[test]
    fn outbox_config_matches_documented_defaults() {
        let outbox = OutboxConfig::default();
        assert_eq!(outbox.batch_size, 10);
        assert_eq!(outbox.poll_interval_ms, 500);
    }
}
