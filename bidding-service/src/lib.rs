pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod store;

use store::{SqlxBidRepository, SqlxItemRepository};
use transactional_outbox::SqlxOutboxRepository;

/// The concrete `BidService` instantiation used by this binary — sqlx-backed
/// repositories bound to the shared outbox store.
pub type AppBidService = domain::BidService<SqlxItemRepository, SqlxBidRepository, SqlxOutboxRepository>;
