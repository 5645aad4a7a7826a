//! # Transactional Outbox
//!
//! Guarantees that a business mutation and the event announcing it commit atomically:
//! the event is written to the `outbox_events` table in the *same* transaction as the
//! business row, and a background [`OutboxRelay`] later moves it to the broker.
//!
//! This gives **at-least-once delivery**: the relay may publish an event more than once
//! (crash between publish and commit), so every consumer of these events must be
//! idempotent — see the `idempotent-consumer` crate.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use transactional_outbox::{OutboxRepository, SqlxOutboxRepository};
//! use event_schema::OutboxEvent;
//! use db_pool::TransactionManager;
//!
//! async fn place_bid(
//!     txm: &TransactionManager,
//!     outbox: &SqlxOutboxRepository,
//!     payload: Vec<u8>,
//! ) -> anyhow::Result<()> {
//!     let mut tx = txm.begin().await?;
//!
//!     // ... insert the bid, update the item's current_highest_bid ...
//!
//!     let event = OutboxEvent::new("bid.placed", payload);
//!     outbox.save_event(&mut tx, &event).await?;
//!
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

mod error;
pub mod metrics;

pub use error::{OutboxError, OutboxResult};

use async_trait::async_trait;
use bus::BusPublisher;
use db_pool::{StoreError, TransactionManager, Tx};
use event_schema::{OutboxEvent, OutboxStatus};
use sqlx::{PgPool, Row};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Repository operations backing the outbox (spec §4.2).
///
/// `save_event` and `claim_pending` both take the caller's [`Tx`] — no event row exists
/// without its corresponding business mutation in the same transaction, and vice versa.
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Insert a new Pending row. Must be called with the same `tx` that holds the
    /// business mutation.
    async fn save_event(&self, tx: &mut Tx, event: &OutboxEvent) -> OutboxResult<()>;

    /// Atomically selects up to `limit` Pending rows, ordered by `created_at` ascending,
    /// skipping rows already locked by another transaction, and transitions them to
    /// Processing. If the caller's `tx` rolls back, the rows revert to unclaimed Pending.
    async fn claim_pending(&self, tx: &mut Tx, limit: i64) -> OutboxResult<Vec<OutboxEvent>>;

    /// Transition an event to a terminal status, stamping `processed_at`.
    async fn mark_status(
        &self,
        tx: &mut Tx,
        event_id: Uuid,
        status: OutboxStatus,
    ) -> OutboxResult<()>;

    /// Pending count and oldest-pending age in seconds, for the relay's gauge metrics.
    /// Reads outside any transaction — approximate by nature.
    async fn pending_stats(&self) -> OutboxResult<(i64, i64)>;
}

/// sqlx/Postgres implementation of [`OutboxRepository`].
pub struct SqlxOutboxRepository {
    pool: PgPool,
}

impl SqlxOutboxRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_event(row: sqlx::postgres::PgRow) -> OutboxResult<OutboxEvent> {
    let status_str: String = row.try_get("status")?;
    let status = OutboxStatus::from_str(&status_str)
        .map_err(|_| OutboxError::Database(sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: format!("unrecognized outbox status: {status_str}").into(),
        }))?;

    Ok(OutboxEvent {
        id: row.try_get("id")?,
        event_type: row.try_get("event_type")?,
        payload: row.try_get("payload")?,
        status,
        created_at: row.try_get("created_at")?,
        processed_at: row.try_get("processed_at")?,
    })
}

#[async_trait]
impl OutboxRepository for SqlxOutboxRepository {
    async fn save_event(&self, tx: &mut Tx, event: &OutboxEvent) -> OutboxResult<()> {
        sqlx::query(
            r#"
            INSERT INTO outbox_events (id, event_type, payload, status, created_at, processed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.id)
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(event.status.as_str())
        .bind(event.created_at)
        .bind(event.processed_at)
        .execute(&mut **tx)
        .await?;

        debug!(event_id = %event.id, event_type = %event.event_type, "event saved to outbox");
        Ok(())
    }

    async fn claim_pending(&self, tx: &mut Tx, limit: i64) -> OutboxResult<Vec<OutboxEvent>> {
        let rows = sqlx::query(
            r#"
            UPDATE outbox_events
            SET status = 'processing'
            WHERE id IN (
                SELECT id FROM outbox_events
                WHERE status = 'pending'
                ORDER BY created_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, event_type, payload, status, created_at, processed_at
            "#,
        )
        .bind(limit)
        .fetch_all(&mut **tx)
        .await?;

        let events = rows
            .into_iter()
            .map(row_to_event)
            .collect::<OutboxResult<Vec<_>>>()?;

        debug!(count = events.len(), "claimed pending outbox events");
        Ok(events)
    }

    async fn mark_status(
        &self,
        tx: &mut Tx,
        event_id: Uuid,
        status: OutboxStatus,
    ) -> OutboxResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events
            SET status = $2,
                processed_at = CASE WHEN $2 IN ('published', 'failed') THEN NOW() ELSE processed_at END
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .bind(status.as_str())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            warn!(event_id = %event_id, "event not found when marking status");
            return Err(OutboxError::EventNotFound(event_id));
        }

        Ok(())
    }

    async fn pending_stats(&self) -> OutboxResult<(i64, i64)> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*)::BIGINT AS pending,
                COALESCE(EXTRACT(EPOCH FROM (NOW() - MIN(created_at)))::BIGINT, 0) AS age_seconds
            FROM outbox_events
            WHERE status = 'pending'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let pending: i64 = row.try_get("pending")?;
        let age: i64 = row.try_get("age_seconds")?;
        Ok((pending, age))
    }
}

/// Background relay moving events from the outbox to the bus (spec §4.3).
///
/// At-least-once publisher: ordering is FIFO-by-`created_at` per event_type within one
/// relay instance; across parallel relay instances on one exchange, ordering is
/// best-effort only (lock-skipping `claim_pending` gives each relay a disjoint subset).
pub struct OutboxRelay<R: OutboxRepository> {
    repository: Arc<R>,
    publisher: Arc<dyn BusPublisher>,
    txm: TransactionManager,
    batch_size: i64,
    poll_interval: Duration,
    exchange: String,
    metrics: Option<metrics::OutboxMetrics>,
}

impl<R: OutboxRepository> OutboxRelay<R> {
    pub fn new(
        repository: Arc<R>,
        publisher: Arc<dyn BusPublisher>,
        txm: TransactionManager,
        exchange: impl Into<String>,
        batch_size: i64,
        poll_interval: Duration,
    ) -> Self {
        Self {
            repository,
            publisher,
            txm,
            batch_size,
            poll_interval,
            exchange: exchange.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: metrics::OutboxMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run the relay loop until `cancel` fires. Finishes the in-flight tick (or aborts
    /// cleanly at the next suspension point) before returning.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            batch_size = self.batch_size,
            poll_interval_ms = self.poll_interval.as_millis(),
            exchange = %self.exchange,
            "outbox relay starting"
        );

        loop {
            if cancel.is_cancelled() {
                info!("outbox relay shutting down");
                return;
            }

            match self.tick().await {
                Ok(0) => debug!("no pending events"),
                Ok(count) => info!(published = count, "published events from outbox"),
                Err(e) => error!(error = %e, "outbox relay tick failed"),
            }

            if let Some(metrics) = &self.metrics {
                if let Ok((pending, age)) = self.repository.pending_stats().await {
                    metrics.pending.set(pending);
                    metrics.oldest_pending_age_seconds.set(age);
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("outbox relay shutting down");
                    return;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// One relay tick (spec §4.3 algorithm). `begin -> claim -> publish each -> mark ->
    /// commit`; any publish failure rolls back the whole tick, reverting claimed rows to
    /// Pending for retry next tick.
    async fn tick(&self) -> OutboxResult<usize> {
        let mut tx = match self.txm.begin().await {
            Ok(tx) => tx,
            Err(e) => return Err(OutboxError::StoreUnavailable(e)),
        };

        let events = self.repository.claim_pending(&mut tx, self.batch_size).await?;
        if events.is_empty() {
            tx.rollback().await.map_err(OutboxError::StoreUnavailable)?;
            return Ok(0);
        }

        let mut published = 0;
        for event in &events {
            match self
                .publisher
                .publish(&self.exchange, event.routing_key(), &event.payload)
                .await
            {
                Ok(()) => {
                    self.repository
                        .mark_status(&mut tx, event.id, OutboxStatus::Published)
                        .await?;
                    published += 1;
                    if let Some(metrics) = &self.metrics {
                        metrics.published.inc();
                    }
                }
                Err(e) => {
                    warn!(event_id = %event.id, error = %e, "publish failed, rolling back tick");
                    tx.rollback().await.map_err(OutboxError::StoreUnavailable)?;
                    return Err(OutboxError::BrokerUnavailable(e));
                }
            }
        }

        tx.commit().await.map_err(OutboxError::StoreUnavailable)?;
        Ok(published)
    }
}

impl From<StoreError> for OutboxError {
    fn from(err: StoreError) -> Self {
        OutboxError::StoreUnavailable(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeRepository {
        pending: Mutex<Vec<OutboxEvent>>,
        published: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl OutboxRepository for FakeRepository {
        async fn save_event(&self, _tx: &mut Tx, _event: &OutboxEvent) -> OutboxResult<()> {
            unimplemented!("not exercised by relay tests")
        }

        async fn claim_pending(&self, _tx: &mut Tx, limit: i64) -> OutboxResult<Vec<OutboxEvent>> {
            let mut pending = self.pending.lock().unwrap();
            let n = (limit as usize).min(pending.len());
            Ok(pending.drain(..n).collect())
        }

        async fn mark_status(
            &self,
            _tx: &mut Tx,
            event_id: Uuid,
            status: OutboxStatus,
        ) -> OutboxResult<()> {
            if status == OutboxStatus::Published {
                self.published.lock().unwrap().push(event_id);
            }
            Ok(())
        }

        async fn pending_stats(&self) -> OutboxResult<(i64, i64)> {
            Ok((self.pending.lock().unwrap().len() as i64, 0))
        }
    }

    // `claim_pending`'s claimed-rows-revert-on-rollback and the relay's tick/commit
    // flow both need a live `Tx` bound to a real Postgres connection, so the end-to-end
    // relay loop is exercised in bidding-service's `#[ignore]`-gated integration tests
    // rather than here. This module covers the parts that don't need a transaction.

    #[test]
    fn outbox_event_routing_key_is_event_type() {
        let event = OutboxEvent::new("bid.placed", b"payload".to_vec());
        assert_eq!(event.routing_key(), "bid.placed");
    }
}
