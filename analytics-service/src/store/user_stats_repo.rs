//! `user_stats` table access — the single upsert keyed by `user_id` from spec §4.6.

use crate::error::ConsumerError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use db_pool::Tx;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct UserStats {
    pub user_id: Uuid,
    pub total_bids_placed: i64,
    pub total_amount_bid: i64,
    pub last_bid_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserStatsRepository: Send + Sync {
    /// Insert-or-accumulate: first occurrence seeds the row, a conflict increments the
    /// counters and takes the later of the existing/incoming `last_bid_at`.
    async fn record_bid(
        &self,
        tx: &mut Tx,
        user_id: Uuid,
        amount: i64,
        bid_timestamp: DateTime<Utc>,
    ) -> Result<(), ConsumerError>;
}

pub struct SqlxUserStatsRepository;

#[async_trait]
impl UserStatsRepository for SqlxUserStatsRepository {
    async fn record_bid(
        &self,
        tx: &mut Tx,
        user_id: Uuid,
        amount: i64,
        bid_timestamp: DateTime<Utc>,
    ) -> Result<(), ConsumerError> {
        sqlx::query(
            r#"
            INSERT INTO user_stats (user_id, total_bids_placed, total_amount_bid, last_bid_at, updated_at)
            VALUES ($1, 1, $2, $3, NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                total_bids_placed = user_stats.total_bids_placed + 1,
                total_amount_bid = user_stats.total_amount_bid + EXCLUDED.total_amount_bid,
                last_bid_at = GREATEST(user_stats.last_bid_at, EXCLUDED.last_bid_at),
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(bid_timestamp)
        .execute(&mut **tx)
        .await
        .map_err(|e| ConsumerError::TransactionFailed(e.to_string()))?;

        Ok(())
    }
}
