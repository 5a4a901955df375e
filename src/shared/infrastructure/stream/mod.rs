// Ports for a partitioned, key-value, at-least-once message stream.
//
// Purpose
// - Describe what the publisher and the stream reader need from a broker, without implementing it.
//
// Responsibilities
// - Producer side: send one keyed record to an explicit partition and report where it landed.
// - Consumer side: poll batches with a bounded wait and acknowledge progress without blocking.
// - Connector: hand out a consumer bound to a consumer group.
//
// Boundaries
// - Ordering holds within a partition only. Nothing here promises ordering across partitions.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerRecord {
    pub topic: String,
    pub partition: u32,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordMetadata {
    pub partition: u32,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("stream unavailable: {0}")]
    Unavailable(String),

    #[error("unknown partition {partition} for topic {topic}")]
    UnknownPartition { topic: String, partition: u32 },

    #[error("unknown topic {0}")]
    UnknownTopic(String),

    #[error("backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait StreamProducer: Send + Sync {
    async fn send(&self, record: ProducerRecord) -> Result<RecordMetadata, StreamError>;
}

#[async_trait]
pub trait StreamConsumer: Send {
    /// Waits up to `timeout` for records past the consumer's position.
    /// An empty batch means the wait elapsed with nothing new.
    async fn poll(&mut self, timeout: Duration) -> Result<Vec<StreamRecord>, StreamError>;

    /// Records the current position for the group. Fire-and-forget: a lost
    /// commit only causes redelivery.
    fn commit_async(&mut self);
}

pub trait StreamConnector: Send + Sync {
    fn connect(&self, group_id: &str) -> Box<dyn StreamConsumer>;
}

pub mod in_memory;
