//! `items` table access (spec.md §3, §6).

use crate::error::{map_get_item_error, BidError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use db_pool::Tx;
use sqlx::Row;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Active,
    Ended,
    Cancelled,
}

impl ItemStatus {
    fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::Ended => "ended",
            ItemStatus::Cancelled => "cancelled",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "ended" => ItemStatus::Ended,
            "cancelled" => ItemStatus::Cancelled,
            _ => ItemStatus::Active,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Item {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub start_price: i64,
    pub current_highest_bid: i64,
    pub end_at: DateTime<Utc>,
    pub status: ItemStatus,
}

/// Row-lock and mutation operations on `items`. `get_item_for_update` is the
/// serializing primitive for `PlaceBid` (spec §4.4 step 2).
#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn get_item_for_update(&self, tx: &mut Tx, item_id: Uuid) -> Result<Item, BidError>;
    async fn update_highest_bid(&self, tx: &mut Tx, item_id: Uuid, amount: i64) -> Result<(), BidError>;
}

pub struct SqlxItemRepository;

#[async_trait]
impl ItemRepository for SqlxItemRepository {
    async fn get_item_for_update(&self, tx: &mut Tx, item_id: Uuid) -> Result<Item, BidError> {
        let row = sqlx::query(
            r#"
            SELECT id, seller_id, start_price, current_highest_bid, end_at, status
            FROM items
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(item_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_get_item_error(item_id, e))?
        .ok_or(BidError::ItemNotFound(item_id))?;

        let status: String = row.try_get("status").map_err(|e| map_get_item_error(item_id, e))?;

        Ok(Item {
            id: row.try_get("id").map_err(|e| map_get_item_error(item_id, e))?,
            seller_id: row.try_get("seller_id").map_err(|e| map_get_item_error(item_id, e))?,
            start_price: row.try_get("start_price").map_err(|e| map_get_item_error(item_id, e))?,
            current_highest_bid: row
                .try_get("current_highest_bid")
                .map_err(|e| map_get_item_error(item_id, e))?,
            end_at: row.try_get("end_at").map_err(|e| map_get_item_error(item_id, e))?,
            status: ItemStatus::from_str(&status),
        })
    }

    async fn update_highest_bid(&self, tx: &mut Tx, item_id: Uuid, amount: i64) -> Result<(), BidError> {
        sqlx::query(
            r#"
            UPDATE items
            SET current_highest_bid = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .bind(amount)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_get_item_error(item_id, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        assert_eq!(ItemStatus::from_str("active"), ItemStatus::Active);
        assert_eq!(ItemStatus::from_str("ended"), ItemStatus::Ended);
        assert_eq!(ItemStatus::from_str("cancelled"), ItemStatus::Cancelled);
        assert_eq!(ItemStatus::Ended.as_str(), "ended");
    }
}
