//! Closed error enum for the consumer loop, composing `idempotent_consumer`'s and
//! `bus`'s error taxonomies the way `bidding_service::error` composes
//! `transactional_outbox`'s (spec §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("malformed event payload: {0}")]
    DecodeError(String),

    #[error("transaction failed to commit: {0}")]
    TransactionFailed(String),

    #[error("broker unavailable: {0}")]
    BrokerUnavailable(#[from] bus::BusError),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] db_pool::StoreError),
}

impl From<idempotent_consumer::IdempotencyError> for ConsumerError {
    fn from(err: idempotent_consumer::IdempotencyError) -> Self {
        match err {
            idempotent_consumer::IdempotencyError::StoreUnavailable(e) => {
                ConsumerError::StoreUnavailable(e)
            }
            other => ConsumerError::TransactionFailed(other.to_string()),
        }
    }
}

impl ConsumerError {
    /// True for the poison-message path (spec §4.6 step 1) — these nack without
    /// requeue rather than retrying. Everything else gets `nack(requeue=true)`.
    pub fn is_poison(&self) -> bool {
        matches!(self, ConsumerError::DecodeError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_are_poison_everything_else_is_retried() {
        assert!(ConsumerError::DecodeError("bad json".into()).is_poison());
        assert!(!ConsumerError::TransactionFailed("x".into()).is_poison());
    }
}
