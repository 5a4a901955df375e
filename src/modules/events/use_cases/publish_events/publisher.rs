// Event publisher and fan-out for one logical operation.
//
// Purpose
// - Emit N sub-events for a trace id as independent, concurrently dispatched publish calls.
//
// Responsibilities
// - Build the event, serialize it, pick a partition at random and assign a fresh key per call.
// - Bound each send by the publish timeout; a timed out call is abandoned, not retried.
// - Collect one outcome per sub-event. A failure is logged and reported, never raised, and never
//   stops the sibling calls.

use crate::modules::events::core::event::Event;
use crate::shared::infrastructure::stream::{
    ProducerRecord, RecordMetadata, StreamError, StreamProducer,
};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("unable to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Stream(#[from] StreamError),
}

#[derive(Debug)]
pub struct PublishOutcome {
    pub sequence_id: i32,
    pub result: Result<RecordMetadata, PublishError>,
}

impl PublishOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone)]
pub struct PublisherSettings {
    pub topic: String,
    pub partitions: u32,
    pub padding_size: usize,
    pub publish_timeout: Duration,
}

pub struct EventPublisher {
    producer: Arc<dyn StreamProducer>,
    settings: PublisherSettings,
}

impl EventPublisher {
    pub fn new(producer: Arc<dyn StreamProducer>, settings: PublisherSettings) -> Self {
        let settings = PublisherSettings {
            partitions: settings.partitions.max(1),
            ..settings
        };
        Self { producer, settings }
    }

    pub async fn publish(
        &self,
        trace_id: &str,
        transaction_id: Uuid,
        sequence_id: i32,
    ) -> PublishOutcome {
        let event = Event::new(
            trace_id,
            transaction_id,
            sequence_id,
            self.settings.padding_size,
        );
        if event.is_noise() {
            debug!(%transaction_id, "publishing noise");
        } else {
            info!(%transaction_id, sequence_id, "publishing transaction");
        }
        let result = self.send(&event).await;
        match &result {
            Ok(metadata) => debug!(
                topic = %self.settings.topic,
                partition = metadata.partition,
                offset = metadata.offset,
                "message published"
            ),
            Err(error) => warn!(
                %transaction_id,
                sequence_id,
                %error,
                "unable to publish event"
            ),
        }
        PublishOutcome {
            sequence_id,
            result,
        }
    }

    /// Publishes sequence ids `1..=count` on separate tasks and waits for all of them.
    /// Outcomes arrive in completion order, not sequence order.
    pub async fn fan_out(
        self: &Arc<Self>,
        trace_id: &str,
        transaction_id: Uuid,
        count: i32,
    ) -> Vec<PublishOutcome> {
        let mut tasks = JoinSet::new();
        for sequence_id in 1..=count {
            let publisher = Arc::clone(self);
            let trace_id = trace_id.to_string();
            let span = info_span!("publish", trace_id = %trace_id, sequence_id);
            tasks.spawn(
                async move {
                    publisher
                        .publish(&trace_id, transaction_id, sequence_id)
                        .await
                }
                .instrument(span),
            );
        }

        let mut outcomes = Vec::with_capacity(count.max(0) as usize);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(error) => warn!(%transaction_id, %error, "publish task did not complete"),
            }
        }
        outcomes
    }

    async fn send(&self, event: &Event) -> Result<RecordMetadata, PublishError> {
        let value = serde_json::to_string(event)?;
        let key = Uuid::new_v4().to_string();
        let partition = rand::rng().random_range(0..self.settings.partitions);
        debug!(
            %key,
            topic = %self.settings.topic,
            partition,
            "publishing event"
        );

        let record = ProducerRecord {
            topic: self.settings.topic.clone(),
            partition,
            key,
            value,
        };
        let timeout = self.settings.publish_timeout;
        match tokio::time::timeout(timeout, self.producer.send(record)).await {
            Ok(sent) => Ok(sent?),
            Err(_) => Err(PublishError::Timeout(timeout)),
        }
    }
}
