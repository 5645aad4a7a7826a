//! Shared event schemas for the auction platform's outbox/bus wire contract.
//!
//! This crate owns the cross-service contract described in spec §6: every event a
//! producing service writes to its outbox, and every event a consumer decodes off the
//! bus, goes through the types defined here. Payloads are encoded as self-describing
//! JSON bytes rather than a positional binary format, so that a field can be added to
//! `BidPlaced` or `UserCreated` without breaking consumers on an older schema version —
//! added fields are optional, removed fields are tombstoned (kept, deprecated) rather
//! than repurposed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod outbox;

pub use outbox::{OutboxEvent, OutboxStatus};

/// Current schema version for all events on the bus.
pub const SCHEMA_VERSION: u32 = 1;

/// Routing key / `event_type` for the `bid.placed` event.
pub const EVENT_TYPE_BID_PLACED: &str = "bid.placed";
/// Routing key / `event_type` for the `user.created` event.
pub const EVENT_TYPE_USER_CREATED: &str = "user.created";

/// Errors raised while encoding or decoding an event payload.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode event payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode event payload: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("unknown event type: {0}")]
    UnknownEventType(String),
}

/// Envelope wrapping every event body on the bus, carrying the fields the substrate
/// needs regardless of the concrete payload (schema version, event id for dedup).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    pub event_id: Uuid,
    pub schema_version: u32,
    pub timestamp: DateTime<Utc>,
    /// Producing service, e.g. "bidding-service".
    pub source: String,
    pub data: T,
}

impl<T> EventEnvelope<T> {
    pub fn new(event_id: Uuid, source: impl Into<String>, data: T) -> Self {
        Self {
            event_id,
            schema_version: SCHEMA_VERSION,
            timestamp: Utc::now(),
            source: source.into(),
            data,
        }
    }
}

/// Body of the `bid.placed` event (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidPlaced {
    pub bid_id: Uuid,
    pub item_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub timestamp: DateTime<Utc>,
}

/// Body of the `user.created` event (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCreated {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub country_code: String,
    pub created_at: DateTime<Utc>,
}

/// Encode an event body as self-describing binary payload bytes.
pub fn encode<T: Serialize>(
    event_id: Uuid,
    source: impl Into<String>,
    data: T,
) -> Result<Vec<u8>, CodecError> {
    let envelope = EventEnvelope::new(event_id, source, data);
    serde_json::to_vec(&envelope).map_err(CodecError::Encode)
}

/// Decode an event payload back into its envelope.
pub fn decode<T: for<'de> Deserialize<'de>>(
    payload: &[u8],
) -> Result<EventEnvelope<T>, CodecError> {
    serde_json::from_slice(payload).map_err(CodecError::Decode)
}

/// Check whether a consumer built against `current_version` can read an event stamped
/// with `message_version`. Exact match only for now — no backward-compat shims exist
/// yet because schema_version has never been bumped in production.
pub fn is_compatible(current_version: u32, message_version: u32) -> bool {
    current_version == message_version
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_bid_placed() {
        let event_id = Uuid::new_v4();
        let body = BidPlaced {
            bid_id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount: 15_000,
            timestamp: Utc::now(),
        };

        let bytes = encode(event_id, "bidding-service", body.clone()).unwrap();
        let decoded: EventEnvelope<BidPlaced> = decode(&bytes).unwrap();

        assert_eq!(decoded.event_id, event_id);
        assert_eq!(decoded.schema_version, SCHEMA_VERSION);
        assert_eq!(decoded.source, "bidding-service");
        assert_eq!(decoded.data, body);
    }

    #[test]
    fn round_trips_user_created() {
        let event_id = Uuid::new_v4();
        let body = UserCreated {
            user_id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            full_name: "Alice Example".to_string(),
            country_code: "US".to_string(),
            created_at: Utc::now(),
        };

        let bytes = encode(event_id, "identity-service", body.clone()).unwrap();
        let decoded: EventEnvelope<UserCreated> = decode(&bytes).unwrap();
        assert_eq!(decoded.data, body);
    }

    #[test]
    fn decode_rejects_garbage() {
        let result: Result<EventEnvelope<BidPlaced>, _> = decode(b"not json");
        assert!(result.is_err());
    }

    #[test]
    fn version_compatibility_is_exact_for_now() {
        assert!(is_compatible(SCHEMA_VERSION, SCHEMA_VERSION));
        assert!(!is_compatible(1, 2));
    }
}
