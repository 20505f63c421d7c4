//! Normalized transaction shape delivered to projectors.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::Checkpoint;

/// One event of a transaction, shape-preserved from the store.
///
/// The body is an opaque payload; headers are a string-keyed mapping of
/// arbitrary values. Neither is inspected or transformed by the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Opaque event payload.
    pub body: serde_json::Value,
    /// Event headers as written by the producer.
    #[serde(default)]
    pub headers: HashMap<String, serde_json::Value>,
}

impl EventEnvelope {
    /// Creates an envelope with an empty header map.
    pub fn new(body: serde_json::Value) -> Self {
        Self {
            body,
            headers: HashMap::new(),
        }
    }
}

/// An immutable committed transaction extracted from a store commit.
///
/// Transactions are handed to observers in store order and cached by their
/// predecessor checkpoint; the adapter never mutates one after extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Store-assigned commit identifier.
    pub id: SmolStr,
    /// Identifier of the stream the transaction was written to.
    pub stream_id: SmolStr,
    /// Position of this transaction in the store's total order.
    pub checkpoint: Checkpoint,
    /// Wall clock at commit time.
    pub timestamp_utc: DateTime<Utc>,
    /// Events of the transaction, in commit order.
    pub events: Vec<EventEnvelope>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_round_trip() {
        let mut headers = HashMap::new();
        headers.insert("source".to_string(), json!("billing"));
        let envelope = EventEnvelope {
            body: json!({"amount": 12}),
            headers,
        };

        let encoded = serde_json::to_string(&envelope).unwrap();
        let decoded: EventEnvelope = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_envelope_headers_default_to_empty() {
        let decoded: EventEnvelope = serde_json::from_str(r#"{"body": 1}"#).unwrap();
        assert!(decoded.headers.is_empty());
    }
}
