//! `bids` table access (spec.md §3, §6).

use crate::error::BidError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use db_pool::Tx;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Bid {
    pub id: Uuid,
    pub item_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait BidRepository: Send + Sync {
    async fn save_bid(&self, tx: &mut Tx, bid: &Bid) -> Result<(), BidError>;
}

pub struct SqlxBidRepository;

#[async_trait]
impl BidRepository for SqlxBidRepository {
    async fn save_bid(&self, tx: &mut Tx, bid: &Bid) -> Result<(), BidError> {
        sqlx::query(
            r#"
            INSERT INTO bids (id, item_id, user_id, amount, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(bid.id)
        .bind(bid.item_id)
        .bind(bid.user_id)
        .bind(bid.amount)
        .bind(bid.created_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| BidError::TransactionFailed(e.to_string()))?;

        Ok(())
    }
}
