//! Identity-service's own error taxonomy, shaped like `error_handling::DomainError`
//! (same response envelope, same status-code grouping) but scoped to user creation —
//! the bid-domain error table (spec §7) doesn't cover "email already registered".

use error_handling::ErrorResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("email already registered")]
    EmailAlreadyRegistered,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("transaction failed to commit: {0}")]
    TransactionFailed(String),

    #[error("broker unavailable: {0}")]
    BrokerUnavailable(#[from] bus::BusError),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] db_pool::StoreError),
}

impl IdentityError {
    pub fn status_code(&self) -> u16 {
        match self {
            IdentityError::EmailAlreadyRegistered => 409,
            IdentityError::InvalidEmail => 400,
            IdentityError::TransactionFailed(_) => 500,
            IdentityError::BrokerUnavailable(_) => 503,
            IdentityError::StoreUnavailable(_) => 503,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            IdentityError::EmailAlreadyRegistered => "EMAIL_ALREADY_REGISTERED",
            IdentityError::InvalidEmail => "INVALID_EMAIL",
            IdentityError::TransactionFailed(_) => "TRANSACTION_FAILED",
            IdentityError::BrokerUnavailable(_) => "BROKER_UNAVAILABLE",
            IdentityError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            IdentityError::EmailAlreadyRegistered | IdentityError::InvalidEmail => "ValidationError",
            IdentityError::TransactionFailed(_) => "TransactionError",
            IdentityError::BrokerUnavailable(_) => "BrokerUnavailableError",
            IdentityError::StoreUnavailable(_) => "StoreUnavailableError",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.error_type().to_string(),
            message: self.to_string(),
            status: self.status_code(),
            error_type: self.error_type().to_string(),
            code: self.error_code().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl From<transactional_outbox::OutboxError> for IdentityError {
    fn from(err: transactional_outbox::OutboxError) -> Self {
        match err {
            transactional_outbox::OutboxError::StoreUnavailable(e) => IdentityError::StoreUnavailable(e),
            transactional_outbox::OutboxError::BrokerUnavailable(e) => IdentityError::BrokerUnavailable(e),
            other => IdentityError::TransactionFailed(other.to_string()),
        }
    }
}

const PG_UNIQUE_VIOLATION: &str = "23505";

pub fn map_create_user_error(err: sqlx::Error) -> IdentityError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(PG_UNIQUE_VIOLATION) => {
            IdentityError::EmailAlreadyRegistered
        }
        _ => IdentityError::TransactionFailed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_conflict_maps_to_409() {
        assert_eq!(IdentityError::EmailAlreadyRegistered.status_code(), 409);
        assert_eq!(IdentityError::EmailAlreadyRegistered.error_code(), "EMAIL_ALREADY_REGISTERED");
    }

    #[test]
    fn response_body_carries_code_and_message() {
        let response = IdentityError::InvalidEmail.to_response();
        assert_eq!(response.code, "INVALID_EMAIL");
        assert_eq!(response.status, 400);
    }
}
