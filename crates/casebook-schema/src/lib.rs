//! Casebook schema surface: the record type, the operations a model may
//! target, and the schema text used to ground prompts.
//!
//! Everything in this crate is pure and deterministic. The registry is built
//! once at startup and shared by reference across prompt-building calls; the
//! same inputs always produce the same grounding text.

pub mod registry;

use serde::{Deserialize, Serialize};

pub use registry::{OperationKind, OperationSignature, Param, SchemaRegistry};

/// Field names of [`Record`], in declaration order.
///
/// The registry renders this list into grounding text and the validator
/// checks mutation completions against it.
pub const RECORD_FIELDS: [&str; 5] = [
    "agent_name",
    "customer_email",
    "customer_order",
    "customer_phone",
    "customer_sentiment",
];

/// Name of the table backing the structured store.
pub const TABLE_NAME: &str = "customer_information";

/// One structured fact extracted from a customer-service conversation.
///
/// Every field is present but may be empty; there is no null. A record is
/// immutable once constructed: the extraction path creates it, the executor
/// persists it, nothing mutates it in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub agent_name: String,
    pub customer_email: String,
    pub customer_order: String,
    pub customer_phone: String,
    pub customer_sentiment: String,
}

impl Record {
    /// Field values in [`RECORD_FIELDS`] order.
    pub fn values(&self) -> [&str; 5] {
        [
            &self.agent_name,
            &self.customer_email,
            &self.customer_order,
            &self.customer_phone,
            &self.customer_sentiment,
        ]
    }
}

/// Errors from the schema registry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_values_follow_field_order() {
        let record = Record {
            agent_name: "a".to_string(),
            customer_email: "b".to_string(),
            customer_order: "c".to_string(),
            customer_phone: "d".to_string(),
            customer_sentiment: "e".to_string(),
        };
        assert_eq!(record.values(), ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn record_survives_json_round_trip() {
        let record = Record {
            agent_name: "Dana".to_string(),
            customer_email: "kit@example.com".to_string(),
            customer_order: String::new(),
            customer_phone: "555-0186".to_string(),
            customer_sentiment: "frustrated".to_string(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
