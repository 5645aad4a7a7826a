use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an outbox row. Transitions are one-way: Pending -> Processing -> Published,
/// or Pending -> Processing -> Failed. `Failed` is reserved for future dead-letter
/// handling — nothing in this workspace writes it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboxStatus {
    Pending,
    Processing,
    Published,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Processing => "processing",
            OutboxStatus::Published => "published",
            OutboxStatus::Failed => "failed",
        }
    }

    /// Status transitions that stamp `processed_at`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OutboxStatus::Published | OutboxStatus::Failed)
    }
}

impl std::str::FromStr for OutboxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OutboxStatus::Pending),
            "processing" => Ok(OutboxStatus::Processing),
            "published" => Ok(OutboxStatus::Published),
            "failed" => Ok(OutboxStatus::Failed),
            other => Err(format!("unknown outbox status: {other}")),
        }
    }
}

impl std::fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A durable record of a business event awaiting publication (spec §3).
///
/// No event row exists without its corresponding business mutation in the same
/// transaction, and vice versa — callers must write this alongside the aggregate
/// mutation using the same `Tx`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub event_type: String,
    /// Self-describing binary payload — see the crate-level docs for the encoding.
    pub payload: Vec<u8>,
    pub status: OutboxStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl OutboxEvent {
    /// Construct a new Pending event ready to be saved inside the caller's transaction.
    pub fn new(event_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            payload,
            status: OutboxStatus::Pending,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    pub fn mark_processing(&mut self) {
        self.status = OutboxStatus::Processing;
    }

    pub fn mark_published(&mut self) {
        self.status = OutboxStatus::Published;
        self.processed_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self) {
        self.status = OutboxStatus::Failed;
        self.processed_at = Some(Utc::now());
    }

    /// The routing key on the broker, which doubles as the `event_type` column.
    pub fn routing_key(&self) -> &str {
        &self.event_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_starts_pending() {
        let event = OutboxEvent::new("bid.placed", b"payload".to_vec());
        assert_eq!(event.status, OutboxStatus::Pending);
        assert!(event.processed_at.is_none());
    }

    #[test]
    fn mark_published_stamps_processed_at() {
        let mut event = OutboxEvent::new("bid.placed", b"payload".to_vec());
        event.mark_processing();
        assert_eq!(event.status, OutboxStatus::Processing);
        event.mark_published();
        assert_eq!(event.status, OutboxStatus::Published);
        assert!(event.processed_at.is_some());
    }

    #[test]
    fn terminal_statuses() {
        assert!(OutboxStatus::Published.is_terminal());
        assert!(OutboxStatus::Failed.is_terminal());
        assert!(!OutboxStatus::Pending.is_terminal());
        assert!(!OutboxStatus::Processing.is_terminal());
    }

    #[test]
    fn status_as_str_matches_db_representation() {
        assert_eq!(OutboxStatus::Pending.as_str(), "pending");
        assert_eq!(OutboxStatus::Published.as_str(), "published");
    }

    #[test]
    fn status_round_trips_through_str() {
        use std::str::FromStr;
        for status in [
            OutboxStatus::Pending,
            OutboxStatus::Processing,
            OutboxStatus::Published,
            OutboxStatus::Failed,
        ] {
            assert_eq!(OutboxStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(OutboxStatus::from_str("bogus").is_err());
    }
}
