//! Layered configuration: `config/default.toml` -> `config/{RUN_ENV}.toml` ->
//! `ANALYTICS__*` environment variables, mirroring `bidding-service::config`.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub http: HttpConfig,
    pub broker: BrokerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_addr")]
    pub addr: String,
}

fn default_http_addr() -> String {
    "0.0.0.0:8082".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    pub url: String,
    #[serde(default = "default_exchange")]
    pub exchange: String,
    #[serde(default = "default_queue")]
    pub queue: String,
    #[serde(default = "default_binding_pattern")]
    pub binding_pattern: String,
}

fn default_exchange() -> String {
    "auction.events".to_string()
}

fn default_queue() -> String {
    "analytics-service".to_string()
}

fn default_binding_pattern() -> String {
    "bid.*".to_string()
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let run_env = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_env}")).required(false))
            .add_source(config::Environment::default().prefix("ANALYTICS").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_to_bid_star() {
        assert_eq!(default_binding_pattern(), "bid.*");
        assert_eq!(default_queue(), "analytics-service");
    }
}
