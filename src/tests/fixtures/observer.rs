// Observer settings with short windows, and a connector that counts connections.

use crate::modules::correlation::use_cases::ingest_stream::backoff::BackoffSettings;
use crate::modules::correlation::use_cases::query_by_token::observer::ObserverSettings;
use crate::shared::infrastructure::stream::in_memory::InMemoryStream;
use crate::shared::infrastructure::stream::{StreamConnector, StreamConsumer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn make_observer_settings() -> ObserverSettings {
    ObserverSettings {
        ttl: Duration::from_secs(30),
        cleanup_interval: Duration::from_secs(30),
        poll_timeout: Duration::from_millis(20),
        observation_window: Duration::from_millis(300),
        settle_interval: Duration::from_millis(10),
        backoff: BackoffSettings {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            multiplier: 2.0,
        },
        consumer_group_prefix: "correlation-tests".to_string(),
    }
}

pub struct CountingConnector {
    stream: InMemoryStream,
    connections: AtomicUsize,
}

impl CountingConnector {
    pub fn new(stream: InMemoryStream) -> Self {
        Self {
            stream,
            connections: AtomicUsize::new(0),
        }
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl StreamConnector for CountingConnector {
    fn connect(&self, group_id: &str) -> Box<dyn StreamConsumer> {
        self.connections.fetch_add(1, Ordering::SeqCst);
        self.stream.connect(group_id)
    }
}
