//! Idempotent Consumer (spec.md §4.6): decode -> dedup-gate -> upsert -> mark -> commit
//! -> ack, all inside one transaction shared with the dedup gate (invariant 5).

use crate::error::ConsumerError;
use crate::store::UserStatsRepository;
use bus::{BusSubscriber, Delivery};
use db_pool::TransactionManager;
use event_schema::{BidPlaced, EventEnvelope};
use idempotent_consumer::IdempotencyStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct Consumer<SR: UserStatsRepository> {
    txm: TransactionManager,
    stats: Arc<SR>,
    idempotency: IdempotencyStore,
    subscriber: Arc<dyn BusSubscriber>,
}

impl<SR: UserStatsRepository> Consumer<SR> {
    pub fn new(
        txm: TransactionManager,
        stats: Arc<SR>,
        idempotency: IdempotencyStore,
        subscriber: Arc<dyn BusSubscriber>,
    ) -> Self {
        Self {
            txm,
            stats,
            idempotency,
            subscriber,
        }
    }

    /// Run until `cancel` fires. A delivery in flight is finished before the loop
    /// returns — cancellation is only observed between deliveries.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("analytics consumer starting");

        loop {
            let delivery = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("analytics consumer shutting down");
                    return;
                }
                result = self.subscriber.recv() => match result {
                    Ok(delivery) => delivery,
                    Err(e) => {
                        error!(error = %e, "failed to receive delivery");
                        continue;
                    }
                }
            };

            self.process(&delivery).await;
        }
    }

    async fn process(&self, delivery: &Delivery) {
        match self.handle(delivery).await {
            Ok(()) => {
                if let Err(e) = self.subscriber.ack(delivery.delivery_tag).await {
                    error!(error = %e, "failed to ack delivery");
                }
            }
            Err(e) if e.is_poison() => {
                warn!(error = %e, "poison message, nacking without requeue");
                if let Err(e) = self.subscriber.nack(delivery.delivery_tag, false).await {
                    error!(error = %e, "failed to nack poison delivery");
                }
            }
            Err(e) => {
                warn!(error = %e, "delivery processing failed, requeueing");
                if let Err(e) = self.subscriber.nack(delivery.delivery_tag, true).await {
                    error!(error = %e, "failed to nack delivery for requeue");
                }
            }
        }
    }

    async fn handle(&self, delivery: &Delivery) -> Result<(), ConsumerError> {
        let envelope: EventEnvelope<BidPlaced> = event_schema::decode(&delivery.payload)
            .map_err(|e| ConsumerError::DecodeError(e.to_string()))?;

        let mut tx = self.txm.begin().await?;

        if self.idempotency.is_event_processed(&mut tx, envelope.event_id).await? {
            tx.commit()
                .await
                .map_err(|e| ConsumerError::TransactionFailed(e.to_string()))?;
            return Ok(());
        }

        self.stats
            .record_bid(&mut tx, envelope.data.user_id, envelope.data.amount, envelope.data.timestamp)
            .await?;
        self.idempotency.mark_event_processed(&mut tx, envelope.event_id).await?;

        tx.commit()
            .await
            .map_err(|e| ConsumerError::TransactionFailed(e.to_string()))?;

        info!(event_id = %envelope.event_id, user_id = %envelope.data.user_id, "bid.placed applied to user_stats");
        Ok(())
    }
}
