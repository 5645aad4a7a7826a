//! Error types for idempotent consumer.

use thiserror::Error;

pub type IdempotencyResult<T> = Result<T, IdempotencyError>;

#[derive(Error, Debug)]
pub enum IdempotencyError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] db_pool::StoreError),

    #[error("invalid event id: {0}")]
    InvalidEventId(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IdempotencyError {
    /// PostgreSQL unique violation (23505) on `processed_events.event_id` — the
    /// expected outcome when two consumers race on the same event, not a failure.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            IdempotencyError::Database(sqlx_err) => sqlx_err
                .as_database_error()
                .map(|db_err| db_err.code().as_deref() == Some("23505"))
                .unwrap_or(false),
            _ => false,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IdempotencyError::Database(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed)
                | IdempotencyError::StoreUnavailable(_)
        )
    }
}
