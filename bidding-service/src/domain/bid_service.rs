//! `PlaceBid(item_id, user_id, amount)` — spec.md §4.4, the single public contract of
//! the bidding engine.

use crate::error::BidError;
use crate::store::{Bid, BidRepository, Item, ItemRepository, ItemStatus};
use chrono::Utc;
use db_pool::TransactionManager;
use event_schema::{BidPlaced, OutboxEvent};
use std::sync::Arc;
use tracing::{info, warn};
use transactional_outbox::OutboxRepository;
use uuid::Uuid;

pub struct BidService<IR, BR, OR>
where
    IR: ItemRepository,
    BR: BidRepository,
    OR: OutboxRepository,
{
    txm: TransactionManager,
    items: Arc<IR>,
    bids: Arc<BR>,
    outbox: Arc<OR>,
}

impl<IR, BR, OR> BidService<IR, BR, OR>
where
    IR: ItemRepository,
    BR: BidRepository,
    OR: OutboxRepository,
{
    pub fn new(txm: TransactionManager, items: Arc<IR>, bids: Arc<BR>, outbox: Arc<OR>) -> Self {
        Self {
            txm,
            items,
            bids,
            outbox,
        }
    }

    pub async fn place_bid(
        &self,
        item_id: Uuid,
        user_id: Uuid,
        amount: i64,
    ) -> Result<Bid, BidError> {
        let mut tx = self.txm.begin().await.map_err(BidError::StoreUnavailable)?;

        let item = self.items.get_item_for_update(&mut tx, item_id).await?;

        if let Err(e) = validate_bid(&item, user_id, amount) {
            // No mutation has happened yet; rolling back just releases the row lock.
            let _ = tx.rollback().await;
            return Err(e);
        }

        let now = Utc::now();
        let bid = Bid {
            id: Uuid::new_v4(),
            item_id,
            user_id,
            amount,
            created_at: now,
        };

        self.bids.save_bid(&mut tx, &bid).await?;
        self.items.update_highest_bid(&mut tx, item_id, amount).await?;

        let body = BidPlaced {
            bid_id: bid.id,
            item_id,
            user_id,
            amount,
            timestamp: now,
        };
        let payload = event_schema::encode(Uuid::new_v4(), "bidding-service", body)
            .map_err(|e| BidError::TransactionFailed(e.to_string()))?;
        let event = OutboxEvent::new(event_schema::EVENT_TYPE_BID_PLACED, payload);
        self.outbox.save_event(&mut tx, &event).await?;

        tx.commit().await.map_err(|e| {
            warn!(item_id = %item_id, error = %e, "commit failed after bid validation succeeded");
            BidError::TransactionFailed(e.to_string())
        })?;

        info!(item_id = %item_id, user_id = %user_id, amount, bid_id = %bid.id, "bid placed");
        Ok(bid)
    }
}

fn validate_bid(item: &Item, user_id: Uuid, amount: i64) -> Result<(), BidError> {
    if item.seller_id == user_id {
        return Err(BidError::SellerCannotBid);
    }
    if amount <= 0 {
        return Err(BidError::InvalidBidAmount);
    }
    if amount <= item.current_highest_bid {
        return Err(BidError::BidTooLow);
    }
    if item.status != ItemStatus::Active || Utc::now() >= item.end_at {
        return Err(BidError::AuctionEnded);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item(seller_id: Uuid, current_highest_bid: i64, end_at: chrono::DateTime<Utc>) -> Item {
        Item {
            id: Uuid::new_v4(),
            seller_id,
            start_price: 10_000,
            current_highest_bid,
            end_at,
            status: ItemStatus::Active,
        }
    }

    #[test]
    fn rejects_seller_bidding_on_own_item() {
        let seller = Uuid::new_v4();
        let item = item(seller, 0, Utc::now() + Duration::hours(1));
        let err = validate_bid(&item, seller, 15_000).unwrap_err();
        assert!(matches!(err, BidError::SellerCannotBid));
    }

    #[test]
    fn rejects_non_positive_amount() {
        let item = item(Uuid::new_v4(), 0, Utc::now() + Duration::hours(1));
        let err = validate_bid(&item, Uuid::new_v4(), 0).unwrap_err();
        assert!(matches!(err, BidError::InvalidBidAmount));
    }

    #[test]
    fn rejects_bid_equal_to_current_highest() {
        let item = item(Uuid::new_v4(), 15_000, Utc::now() + Duration::hours(1));
        let err = validate_bid(&item, Uuid::new_v4(), 15_000).unwrap_err();
        assert!(matches!(err, BidError::BidTooLow));
    }

    #[test]
    fn rejects_bid_on_ended_auction() {
        let item = item(Uuid::new_v4(), 0, Utc::now() - Duration::seconds(1));
        let err = validate_bid(&item, Uuid::new_v4(), 15_000).unwrap_err();
        assert!(matches!(err, BidError::AuctionEnded));
    }

    #[test]
    fn accepts_a_strictly_higher_bid_before_the_deadline() {
        let item = item(Uuid::new_v4(), 10_000, Utc::now() + Duration::hours(1));
        assert!(validate_bid(&item, Uuid::new_v4(), 10_001).is_ok());
    }
}
