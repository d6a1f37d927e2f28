use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope for a notification travelling over a bus.
///
/// Notes:
/// - `event_id` allows consumers to de-duplicate at-least-once deliveries.
/// - `sequence_number` is monotonically increasing per publisher.
/// - `source` names the publishing component (e.g. "catalog", "scheduler").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    source: String,

    /// Monotonically increasing position in the publisher's stream.
    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        source: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            source: source.into(),
            sequence_number,
            payload,
        }
    }

    /// Wrap a payload with a fresh UUIDv7 event id.
    pub fn wrap(source: impl Into<String>, sequence_number: u64, payload: E) -> Self {
        Self::new(Uuid::now_v7(), source, sequence_number, payload)
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }
}
