use thiserror::Error;

pub type BusResult<T> = Result<T, BusError>;

/// Every broker failure normalizes to this at the trait boundary — callers never see
/// the underlying `rdkafka::error::KafkaError` directly (spec §7/§9 open question).
#[derive(Debug, Error)]
pub enum BusError {
    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),

    #[error("payload rejected by broker: {0}")]
    DeliveryFailed(String),
}

impl From<rdkafka::error::KafkaError> for BusError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        BusError::BrokerUnavailable(err.to_string())
    }
}
