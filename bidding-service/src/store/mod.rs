pub mod bid_repo;
pub mod item_repo;

pub use bid_repo::{Bid, BidRepository, SqlxBidRepository};
pub use item_repo::{Item, ItemRepository, ItemStatus, SqlxItemRepository};
