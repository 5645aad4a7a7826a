//! Error types for the transactional outbox library.

use thiserror::Error;
use uuid::Uuid;

pub type OutboxResult<T> = Result<T, OutboxError>;

#[derive(Error, Debug)]
pub enum OutboxError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] db_pool::StoreError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("event not found: {0}")]
    EventNotFound(Uuid),

    #[error("broker unavailable: {0}")]
    BrokerUnavailable(#[from] bus::BusError),
}
