//! Unified domain error taxonomy for the auction services (spec §7).
//!
//! Domain errors (`ItemNotFound`, `SellerCannotBid`, `InvalidBidAmount`, `BidTooLow`,
//! `AuctionEnded`, `LockTimeout`, `TransactionFailed`) are surfaced to the caller of a
//! synchronous operation and never retried internally. Infrastructure errors
//! (`BrokerUnavailable`, `StoreUnavailable`) belong to the relay/consumer retry loops
//! and should not reach an HTTP caller directly. `DecodeError` is a poison-message
//! condition handled by a non-requeuing nack, not by the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Standard error body returned by every service's HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
    pub error_type: String,
    pub code: String,
    pub timestamp: String,
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("seller cannot bid on their own item")]
    SellerCannotBid,

    #[error("bid amount must be positive")]
    InvalidBidAmount,

    #[error("bid amount does not exceed the current highest bid")]
    BidTooLow,

    #[error("auction has already ended")]
    AuctionEnded,

    #[error("lock wait timed out, try again")]
    LockTimeout,

    #[error("transaction failed to commit: {0}")]
    TransactionFailed(String),

    #[error("broker unavailable: {0}")]
    BrokerUnavailable(#[from] bus::BusError),

    #[error("malformed event payload: {0}")]
    DecodeError(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] db_pool::StoreError),
}

impl DomainError {
    pub fn status_code(&self) -> u16 {
        match self {
            DomainError::ItemNotFound(_) => 404,
            DomainError::SellerCannotBid => 422,
            DomainError::InvalidBidAmount => 400,
            DomainError::BidTooLow => 409,
            DomainError::AuctionEnded => 409,
            DomainError::LockTimeout => 503,
            DomainError::TransactionFailed(_) => 500,
            DomainError::BrokerUnavailable(_) => 503,
            DomainError::DecodeError(_) => 500,
            DomainError::StoreUnavailable(_) => 503,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            DomainError::ItemNotFound(_) => "ITEM_NOT_FOUND",
            DomainError::SellerCannotBid => "SELLER_CANNOT_BID",
            DomainError::InvalidBidAmount => "INVALID_BID_AMOUNT",
            DomainError::BidTooLow => "BID_TOO_LOW",
            DomainError::AuctionEnded => "AUCTION_ENDED",
            DomainError::LockTimeout => "LOCK_TIMEOUT",
            DomainError::TransactionFailed(_) => "TRANSACTION_FAILED",
            DomainError::BrokerUnavailable(_) => "BROKER_UNAVAILABLE",
            DomainError::DecodeError(_) => "DECODE_ERROR",
            DomainError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            DomainError::ItemNotFound(_) => "NotFoundError",
            DomainError::SellerCannotBid
            | DomainError::InvalidBidAmount
            | DomainError::BidTooLow
            | DomainError::AuctionEnded => "ValidationError",
            DomainError::LockTimeout => "LockTimeoutError",
            DomainError::TransactionFailed(_) => "TransactionError",
            DomainError::BrokerUnavailable(_) => "BrokerUnavailableError",
            DomainError::DecodeError(_) => "DecodeError",
            DomainError::StoreUnavailable(_) => "StoreUnavailableError",
        }
    }

    /// True for the four domain errors spec §7 groups as "client-visible domain
    /// rejection" — callers should treat these as expected outcomes, not failures.
    pub fn is_domain_rejection(&self) -> bool {
        matches!(
            self,
            DomainError::SellerCannotBid
                | DomainError::InvalidBidAmount
                | DomainError::BidTooLow
                | DomainError::AuctionEnded
        )
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

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DomainError::TransactionFailed("row not found".into()),
            _ => DomainError::TransactionFailed(err.to_string()),
        }
    }
}

impl From<transactional_outbox::OutboxError> for DomainError {
    fn from(err: transactional_outbox::OutboxError) -> Self {
        match err {
            transactional_outbox::OutboxError::StoreUnavailable(e) => {
                DomainError::StoreUnavailable(e)
            }
            transactional_outbox::OutboxError::BrokerUnavailable(e) => {
                DomainError::BrokerUnavailable(e)
            }
            other => DomainError::TransactionFailed(other.to_string()),
        }
    }
}

impl From<idempotent_consumer::IdempotencyError> for DomainError {
    fn from(err: idempotent_consumer::IdempotencyError) -> Self {
        match err {
            idempotent_consumer::IdempotencyError::StoreUnavailable(e) => {
                DomainError::StoreUnavailable(e)
            }
            other => DomainError::TransactionFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_rejections_are_flagged() {
        assert!(DomainError::BidTooLow.is_domain_rejection());
        assert!(DomainError::SellerCannotBid.is_domain_rejection());
        assert!(!DomainError::ItemNotFound(Uuid::nil()).is_domain_rejection());
        assert!(!DomainError::LockTimeout.is_domain_rejection());
    }

    #[test]
    fn status_codes_match_the_error_table() {
        assert_eq!(DomainError::ItemNotFound(Uuid::nil()).status_code(), 404);
        assert_eq!(DomainError::InvalidBidAmount.status_code(), 400);
        assert_eq!(DomainError::BidTooLow.status_code(), 409);
        assert_eq!(DomainError::LockTimeout.status_code(), 503);
    }

    #[test]
    fn response_body_carries_code_and_message() {
        let response = DomainError::BidTooLow.to_response();
        assert_eq!(response.code, "BID_TOO_LOW");
        assert_eq!(response.status, 409);
    }
}
