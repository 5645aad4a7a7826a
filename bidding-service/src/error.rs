//! `bidding-service` reuses the shared domain error taxonomy directly — spec §7's
//! error table (`ItemNotFound`, `SellerCannotBid`, `InvalidBidAmount`, `BidTooLow`,
//! `AuctionEnded`, `LockTimeout`, `TransactionFailed`, `BrokerUnavailable`,
//! `StoreUnavailable`) is exactly `error_handling::DomainError`'s variant set.

pub use error_handling::{DomainError as BidError, ErrorResponse};

use uuid::Uuid;

/// PostgreSQL's lock-wait-timeout error code, raised when `SET LOCAL lock_timeout`
/// expires inside `get_item_for_update`.
const PG_LOCK_NOT_AVAILABLE: &str = "55P03";

/// Map a failure from `get_item_for_update` to the right domain error: a missing row
/// is `ItemNotFound`, a Postgres lock-timeout is `LockTimeout`, anything else is a
/// generic `TransactionFailed`.
pub fn map_get_item_error(item_id: Uuid, err: sqlx::Error) -> BidError {
    match &err {
        sqlx::Error::RowNotFound => BidError::ItemNotFound(item_id),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(PG_LOCK_NOT_AVAILABLE) => {
            BidError::LockTimeout
        }
        _ => BidError::TransactionFailed(err.to_string()),
    }
}
