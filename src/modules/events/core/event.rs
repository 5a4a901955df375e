// Event payload published for every sub-step of a logical operation.
//
// Purpose
// - Carry the correlation token (trace id) together with the transaction and its sequence number.
//
// Wire format
// - JSON with camelCase fields: metadata.traceId, transactionId, sequenceId, padding.
// - sequenceId is 1..=N for fan-out events and NOISE_SEQUENCE_ID for background noise.
// - padding only simulates payload size and carries no meaning.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const NOISE_SEQUENCE_ID: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub trace_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub metadata: Metadata,
    pub transaction_id: Uuid,
    pub sequence_id: i32,
    pub padding: String,
}

impl Event {
    pub fn new(
        trace_id: impl Into<String>,
        transaction_id: Uuid,
        sequence_id: i32,
        padding_size: usize,
    ) -> Self {
        Self {
            metadata: Metadata {
                trace_id: trace_id.into(),
            },
            transaction_id,
            sequence_id,
            padding: "a".repeat(padding_size),
        }
    }

    pub fn is_noise(&self) -> bool {
        self.sequence_id == NOISE_SEQUENCE_ID
    }
}
