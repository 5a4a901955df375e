// Correlation observer: the single read entry point over the stream.
//
// Purpose
// - Answer "which records carry trace id X" from a cache the stream reader keeps filling.
//
// Responsibilities
// - Build the cache and start exactly one stream reader on the first query, even when first
//   queries race. The OnceCell guard owns that decision.
// - Wait a bounded observation window, then filter a snapshot by metadata.traceId.
// - Return an empty list for an unknown trace id. Queries never fail.
//
// Lifecycle
// - One observer per process, created at startup and shared by handle.
// - shutdown() stops the reader and returns its stats.

use crate::modules::correlation::core::cache::CorrelationCache;
use crate::modules::correlation::core::record::Record;
use crate::modules::correlation::use_cases::ingest_stream::backoff::BackoffSettings;
use crate::modules::correlation::use_cases::ingest_stream::reader::{ReaderStats, StreamReader};
use crate::shared::infrastructure::stream::StreamConnector;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const TRACE_ID_POINTER: &str = "/metadata/traceId";

#[derive(Debug, Clone)]
pub struct ObserverSettings {
    pub ttl: Duration,
    pub cleanup_interval: Duration,
    pub poll_timeout: Duration,
    pub observation_window: Duration,
    pub settle_interval: Duration,
    pub backoff: BackoffSettings,
    pub consumer_group_prefix: String,
}

struct RunningReader {
    cache: Arc<CorrelationCache>,
    task: Mutex<Option<JoinHandle<ReaderStats>>>,
}

pub struct CorrelationObserver {
    connector: Arc<dyn StreamConnector>,
    settings: ObserverSettings,
    group_id: String,
    reader: OnceCell<RunningReader>,
    readers_started: AtomicUsize,
    shutdown: watch::Sender<bool>,
}

impl CorrelationObserver {
    pub fn new(connector: Arc<dyn StreamConnector>, settings: ObserverSettings) -> Self {
        let group_id = format!(
            "{}_{}",
            settings.consumer_group_prefix,
            Utc::now().timestamp_millis()
        );
        let (shutdown, _) = watch::channel(false);
        Self {
            connector,
            settings,
            group_id,
            reader: OnceCell::new(),
            readers_started: AtomicUsize::new(0),
            shutdown,
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn readers_started(&self) -> usize {
        self.readers_started.load(Ordering::SeqCst)
    }

    /// Waits the full observation window, then returns every record whose
    /// payload carries `trace_id`. Order is unspecified.
    pub async fn events_for(&self, trace_id: &str) -> Vec<Record> {
        let running = self.running().await;
        debug!(
            window_ms = self.settings.observation_window.as_millis() as u64,
            "waiting for the observation window"
        );
        tokio::time::sleep(self.settings.observation_window).await;

        let records = running.cache.snapshot().await;
        info!(records = records.len(), "parsing records");
        let matching = matching(records, trace_id);
        debug!(%trace_id, matching = matching.len(), "returning records");
        matching
    }

    /// Like `events_for`, but returns as soon as `expected` matching records
    /// are present. The observation window stays the upper bound, and on
    /// expiry whatever matched so far is returned.
    pub async fn events_for_expecting(&self, trace_id: &str, expected: usize) -> Vec<Record> {
        let running = self.running().await;
        let deadline = Instant::now() + self.settings.observation_window;
        loop {
            let matching = matching(running.cache.snapshot().await, trace_id);
            if matching.len() >= expected || Instant::now() >= deadline {
                debug!(%trace_id, matching = matching.len(), expected, "returning records");
                return matching;
            }
            let next = Instant::now() + self.settings.settle_interval;
            tokio::time::sleep_until(next.min(deadline)).await;
        }
    }

    /// Signals the reader to stop and waits for it. `None` if no reader was
    /// ever started or it was already stopped. Queries after shutdown no
    /// longer start a reader and see an empty store.
    pub async fn shutdown(&self) -> Option<ReaderStats> {
        self.shutdown.send_replace(true);
        let running = self.reader.get()?;
        let task = running.task.lock().await.take()?;
        match task.await {
            Ok(stats) => Some(stats),
            Err(error) => {
                warn!(%error, "stream reader task failed");
                None
            }
        }
    }

    async fn running(&self) -> &RunningReader {
        self.reader
            .get_or_init(|| async { self.start_reader() })
            .await
    }

    fn start_reader(&self) -> RunningReader {
        let cache = Arc::new(CorrelationCache::new(
            self.settings.ttl,
            self.settings.cleanup_interval,
        ));
        if *self.shutdown.borrow() {
            warn!(group_id = %self.group_id, "observer already shut down, not starting a reader");
            return RunningReader {
                cache,
                task: Mutex::new(None),
            };
        }

        info!(group_id = %self.group_id, "initialising correlation store");
        let reader = StreamReader::new(
            self.connector.connect(&self.group_id),
            Arc::clone(&cache),
            self.settings.poll_timeout,
            self.settings.backoff,
        );
        let task = tokio::spawn(reader.run(self.shutdown.subscribe()));
        self.readers_started.fetch_add(1, Ordering::SeqCst);
        RunningReader {
            cache,
            task: Mutex::new(Some(task)),
        }
    }
}

fn trace_id_of(payload: &str) -> Option<String> {
    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(error) => {
            debug!(%error, "skipping unparseable record");
            return None;
        }
    };
    value
        .pointer(TRACE_ID_POINTER)
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
}

fn matching(records: Vec<Record>, trace_id: &str) -> Vec<Record> {
    records
        .into_iter()
        .filter(|record| trace_id_of(&record.payload).as_deref() == Some(trace_id))
        .collect()
}
