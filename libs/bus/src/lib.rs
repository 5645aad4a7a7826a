//! Bus abstraction matching spec §4.5's AMQP-shaped vocabulary (exchange, routing_key,
//! durable queue + binding_pattern, per-delivery ack/nack), backed by `rdkafka`.
//!
//! No repo in the retrieval pack carries an AMQP client crate; every broker-facing
//! module in the teacher is built on Kafka. Rather than pull in an ungrounded
//! dependency, [`KafkaBus`] maps the spec's AMQP concepts onto Kafka primitives:
//! `exchange` is a fixed topic name, `routing_key` is carried as both the Kafka
//! message key (for partition affinity) and a header (for pattern matching at the
//! subscriber), and `ack`/`nack` map to manual offset store/commit and partition seek.

mod error;

pub use error::{BusError, BusResult};

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{Header, Message, OwnedHeaders, OwnedMessage};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::{Offset, TopicPartitionList};
use std::time::Duration;
use tracing::{debug, warn};

pub const ROUTING_KEY_HEADER: &str = "routing_key";

/// Publisher contract: publish(exchange, routing_key, payload) -> ack | error.
#[async_trait]
pub trait BusPublisher: Send + Sync {
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> BusResult<()>;
}

/// A single delivery handed to a subscriber, carrying enough to ack/nack it later.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub delivery_tag: DeliveryTag,
    pub routing_key: String,
    pub payload: Vec<u8>,
}

/// Opaque handle identifying a delivery's position on the broker, used by ack/nack.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryTag {
    partition: i32,
    offset: i64,
}

/// Subscriber contract: subscribe(queue, binding_pattern) -> stream of deliveries,
/// with per-delivery ack/nack completing the handshake.
#[async_trait]
pub trait BusSubscriber: Send + Sync {
    /// Receive the next delivery whose routing key matches this subscriber's binding
    /// pattern. Deliveries that don't match are acknowledged and skipped internally.
    async fn recv(&self) -> BusResult<Delivery>;

    /// Acknowledge successful processing, committing the delivery's offset.
    async fn ack(&self, tag: DeliveryTag) -> BusResult<()>;

    /// Negative-acknowledge a delivery. `requeue = true` seeks the partition back to
    /// the delivery's offset so the next `recv` redelivers it; `requeue = false` commits
    /// past it without reprocessing (the poison-message path).
    async fn nack(&self, tag: DeliveryTag, requeue: bool) -> BusResult<()>;
}

/// `rdkafka`-backed implementation of both bus traits.
///
/// One durable topic exchange per deployment (spec §6: `auction.events`); routing keys
/// carry dots (`bid.placed`, `user.created`) so a subscriber can bind to a pattern like
/// `bid.*`. Manual offset management (`enable.auto.commit = false`) makes ack/nack
/// meaningful: `ack` stores and commits the offset, `nack(requeue = true)` seeks the
/// partition back so the message is redelivered on the next poll.
pub struct KafkaBus {
    producer: FutureProducer,
    consumer: Option<StreamConsumer>,
    exchange: Option<String>,
    binding_pattern: Option<String>,
}

impl KafkaBus {
    /// Build a publisher-only bus (e.g. for the outbox relay).
    pub fn new_publisher(brokers: &str) -> BusResult<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("max.in.flight.requests.per.connection", "5")
            .create()?;

        Ok(Self {
            producer,
            consumer: None,
            exchange: None,
            binding_pattern: None,
        })
    }

    /// Build a bus with both a publisher and a subscriber bound to `queue` (the
    /// consumer group id) with `binding_pattern` (e.g. `bid.*`, `user.*`, or an exact
    /// routing key).
    pub fn new_subscriber(
        brokers: &str,
        exchange: &str,
        queue: &str,
        binding_pattern: &str,
    ) -> BusResult<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .create()?;

        let consumer: StreamConsumer = ClientConfig::new()
            .set("group.id", queue)
            .set("bootstrap.servers", brokers)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "30000")
            .set("heartbeat.interval.ms", "3000")
            .create()?;

        consumer.subscribe(&[exchange])?;

        debug!(queue, binding_pattern, "bus subscriber bound");

        Ok(Self {
            producer,
            consumer: Some(consumer),
            exchange: Some(exchange.to_string()),
            binding_pattern: Some(binding_pattern.to_string()),
        })
    }

    fn matches_binding(pattern: &str, routing_key: &str) -> bool {
        match pattern.strip_suffix(".*") {
            Some(prefix) => routing_key
                .strip_prefix(prefix)
                .map(|rest| rest.starts_with('.'))
                .unwrap_or(false),
            None => pattern == routing_key,
        }
    }

    fn consumer(&self) -> &StreamConsumer {
        self.consumer
            .as_ref()
            .expect("subscriber operation called on a publisher-only KafkaBus")
    }

    fn topic(&self) -> &str {
        self.exchange
            .as_deref()
            .expect("subscriber operation called on a publisher-only KafkaBus")
    }

    fn to_delivery(msg: &OwnedMessage) -> Option<Delivery> {
        let routing_key = msg
            .headers()?
            .iter()
            .find(|h| h.key == ROUTING_KEY_HEADER)
            .and_then(|h| h.value)
            .map(|bytes| String::from_utf8_lossy(bytes).to_string())?;

        Some(Delivery {
            delivery_tag: DeliveryTag {
                partition: msg.partition(),
                offset: msg.offset(),
            },
            routing_key,
            payload: msg.payload().unwrap_or_default().to_vec(),
        })
    }
}

#[async_trait]
impl BusPublisher for KafkaBus {
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> BusResult<()> {
        let headers = OwnedHeaders::new().insert(Header {
            key: ROUTING_KEY_HEADER,
            value: Some(routing_key.as_bytes()),
        });

        let record = FutureRecord::to(exchange)
            .key(routing_key)
            .payload(payload)
            .headers(headers);

        self.producer
            .send(record, Duration::from_secs(30))
            .await
            .map_err(|(err, _)| BusError::DeliveryFailed(err.to_string()))?;

        debug!(exchange, routing_key, "published event to bus");
        Ok(())
    }
}

#[async_trait]
impl BusSubscriber for KafkaBus {
    async fn recv(&self) -> BusResult<Delivery> {
        let consumer = self.consumer();
        let pattern = self
            .binding_pattern
            .as_deref()
            .expect("subscriber operation called on a publisher-only KafkaBus");

        loop {
            let borrowed = consumer.recv().await?;
            let owned = borrowed.detach();

            let Some(delivery) = Self::to_delivery(&owned) else {
                warn!("dropping bus message without a routing_key header");
                continue;
            };

            if Self::matches_binding(pattern, &delivery.routing_key) {
                return Ok(delivery);
            }

            // Not for this queue's binding — commit past it without surfacing it.
            let mut tpl = TopicPartitionList::new();
            tpl.add_partition_offset(
                self.topic(),
                delivery.delivery_tag.partition,
                Offset::Offset(delivery.delivery_tag.offset + 1),
            )?;
            consumer.commit(&tpl, rdkafka::consumer::CommitMode::Async)?;
        }
    }

    async fn ack(&self, tag: DeliveryTag) -> BusResult<()> {
        let consumer = self.consumer();
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(self.topic(), tag.partition, Offset::Offset(tag.offset + 1))?;
        consumer.commit(&tpl, rdkafka::consumer::CommitMode::Async)?;
        Ok(())
    }

    async fn nack(&self, tag: DeliveryTag, requeue: bool) -> BusResult<()> {
        let consumer = self.consumer();

        if requeue {
            // Seek back to this offset so the next poll redelivers it.
            consumer.seek(
                self.topic(),
                tag.partition,
                Offset::Offset(tag.offset),
                Duration::from_secs(5),
            )?;
        } else {
            // Poison message: commit past it, no redelivery.
            let mut tpl = TopicPartitionList::new();
            tpl.add_partition_offset(
                self.topic(),
                tag.partition,
                Offset::Offset(tag.offset + 1),
            )?;
            consumer.commit(&tpl, rdkafka::consumer::CommitMode::Async)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_binding_matches_prefix() {
        assert!(KafkaBus::matches_binding("bid.*", "bid.placed"));
        assert!(!KafkaBus::matches_binding("bid.*", "user.created"));
        assert!(!KafkaBus::matches_binding("bid.*", "bidder.placed"));
    }

    #[test]
    fn exact_binding_matches_only_itself() {
        assert!(KafkaBus::matches_binding("bid.placed", "bid.placed"));
        assert!(!KafkaBus::matches_binding("bid.placed", "bid.updated"));
    }
}
