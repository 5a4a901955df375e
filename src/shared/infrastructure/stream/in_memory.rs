// In memory implementation of the stream ports.
//
// Purpose
// - Run the publisher and the correlation store in one process and in tests without a broker.
//
// Responsibilities
// - Keep one append-only log per partition and hand out per-partition offsets.
// - Drop records older than the retention period. Each partition keeps a base offset, so offsets
//   never shift when the head of a log is removed.
// - Track committed offsets per consumer group; a new group starts from the earliest offset still
//   retained.
// - Wake waiting consumers when a record is appended.

use crate::shared::infrastructure::stream::{
    ProducerRecord, RecordMetadata, StreamConnector, StreamConsumer, StreamError, StreamProducer,
    StreamRecord,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::time::Instant;
use tracing::debug;

const MAX_POLL_RECORDS: usize = 500;

#[derive(Debug, Clone)]
struct StoredRecord {
    key: String,
    value: String,
    appended_at: Instant,
}

#[derive(Debug, Default)]
struct PartitionLog {
    base_offset: u64,
    records: VecDeque<StoredRecord>,
}

impl PartitionLog {
    fn append(&mut self, record: StoredRecord) -> u64 {
        self.records.push_back(record);
        self.base_offset + self.records.len() as u64 - 1
    }

    fn expire(&mut self, cutoff: Instant) -> usize {
        let mut removed = 0;
        while self
            .records
            .front()
            .is_some_and(|record| record.appended_at <= cutoff)
        {
            self.records.pop_front();
            self.base_offset += 1;
            removed += 1;
        }
        removed
    }
}

struct Inner {
    topic: String,
    retention: Option<Duration>,
    partitions: RwLock<Vec<PartitionLog>>,
    committed: Mutex<HashMap<String, Vec<u64>>>,
    appended: watch::Sender<u64>,
    is_offline: AtomicBool,
    delay_send_ms: AtomicU64,
}

#[derive(Clone)]
pub struct InMemoryStream {
    inner: Arc<Inner>,
}

impl InMemoryStream {
    /// A stream that keeps every record.
    pub fn new(topic: impl Into<String>, partitions: u32) -> Self {
        Self::with_retention(topic, partitions, None)
    }

    /// A stream that drops records once they are older than `retention`.
    pub fn with_retention(
        topic: impl Into<String>,
        partitions: u32,
        retention: Option<Duration>,
    ) -> Self {
        let (appended, _) = watch::channel(0);
        let partitions = (0..partitions.max(1))
            .map(|_| PartitionLog::default())
            .collect();
        Self {
            inner: Arc::new(Inner {
                topic: topic.into(),
                retention,
                partitions: RwLock::new(partitions),
                committed: Mutex::new(HashMap::new()),
                appended,
                is_offline: AtomicBool::new(false),
                delay_send_ms: AtomicU64::new(0),
            }),
        }
    }

    /// Number of records currently retained across all partitions.
    pub async fn len(&self) -> usize {
        self.inner
            .partitions
            .read()
            .await
            .iter()
            .map(|log| log.records.len())
            .sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Removes every record past retention and returns how many were removed.
    /// Sends apply retention too, so this only matters for an idle stream.
    pub async fn enforce_retention(&self) -> usize {
        let mut partitions = self.inner.partitions.write().await;
        self.expire(&mut partitions, Instant::now())
    }

    pub fn committed_offsets(&self, group_id: &str) -> Option<Vec<u64>> {
        self.inner
            .committed
            .lock()
            .ok()
            .and_then(|committed| committed.get(group_id).cloned())
    }

    pub fn toggle_offline(&self) {
        self.inner.is_offline.fetch_xor(true, Ordering::SeqCst);
    }

    pub fn set_delay_send_ms(&self, ms: u64) {
        self.inner.delay_send_ms.store(ms, Ordering::SeqCst);
    }

    fn is_offline(&self) -> bool {
        self.inner.is_offline.load(Ordering::SeqCst)
    }

    fn expire(&self, partitions: &mut [PartitionLog], now: Instant) -> usize {
        let Some(cutoff) = self
            .inner
            .retention
            .and_then(|retention| now.checked_sub(retention))
        else {
            return 0;
        };
        let removed: usize = partitions.iter_mut().map(|log| log.expire(cutoff)).sum();
        if removed > 0 {
            debug!(removed, "dropped records past retention");
        }
        removed
    }
}

#[async_trait]
impl StreamProducer for InMemoryStream {
    async fn send(&self, record: ProducerRecord) -> Result<RecordMetadata, StreamError> {
        let delay = self.inner.delay_send_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.is_offline() {
            return Err(StreamError::Unavailable("in-memory stream offline".into()));
        }
        if record.topic != self.inner.topic {
            return Err(StreamError::UnknownTopic(record.topic));
        }

        let offset = {
            let mut partitions = self.inner.partitions.write().await;
            let now = Instant::now();
            self.expire(&mut partitions, now);
            let log = partitions.get_mut(record.partition as usize).ok_or_else(|| {
                StreamError::UnknownPartition {
                    topic: record.topic.clone(),
                    partition: record.partition,
                }
            })?;
            log.append(StoredRecord {
                key: record.key,
                value: record.value,
                appended_at: now,
            })
        };
        self.inner.appended.send_modify(|appended| *appended += 1);

        Ok(RecordMetadata {
            partition: record.partition,
            offset,
        })
    }
}

impl StreamConnector for InMemoryStream {
    fn connect(&self, group_id: &str) -> Box<dyn StreamConsumer> {
        Box::new(InMemoryConsumer::new(self.clone(), group_id))
    }
}

pub struct InMemoryConsumer {
    stream: InMemoryStream,
    group_id: String,
    positions: Vec<u64>,
    appended: watch::Receiver<u64>,
}

impl InMemoryConsumer {
    fn new(stream: InMemoryStream, group_id: &str) -> Self {
        let positions = stream.committed_offsets(group_id).unwrap_or_default();
        let appended = stream.inner.appended.subscribe();
        Self {
            stream,
            group_id: group_id.to_string(),
            positions,
            appended,
        }
    }

    async fn fetch(&mut self) -> Vec<StreamRecord> {
        let partitions = self.stream.inner.partitions.read().await;
        if self.positions.len() < partitions.len() {
            self.positions.resize(partitions.len(), 0);
        }

        let mut batch = Vec::new();
        for (partition, log) in partitions.iter().enumerate() {
            // A position behind the base offset points at records already dropped.
            let start = self.positions[partition].max(log.base_offset);
            let skip = (start - log.base_offset) as usize;
            let take = log
                .records
                .len()
                .saturating_sub(skip)
                .min(MAX_POLL_RECORDS - batch.len());
            for (index, stored) in log.records.iter().enumerate().skip(skip).take(take) {
                batch.push(StreamRecord {
                    topic: self.stream.inner.topic.clone(),
                    partition: partition as u32,
                    offset: log.base_offset + index as u64,
                    key: stored.key.clone(),
                    value: stored.value.clone(),
                });
            }
            self.positions[partition] = start + take as u64;
            if batch.len() >= MAX_POLL_RECORDS {
                break;
            }
        }
        batch
    }
}

#[async_trait]
impl StreamConsumer for InMemoryConsumer {
    async fn poll(&mut self, timeout: Duration) -> Result<Vec<StreamRecord>, StreamError> {
        if self.stream.is_offline() {
            return Err(StreamError::Unavailable("in-memory stream offline".into()));
        }

        let deadline = Instant::now() + timeout;
        loop {
            self.appended.borrow_and_update();
            let batch = self.fetch().await;
            if !batch.is_empty() {
                return Ok(batch);
            }
            match tokio::time::timeout_at(deadline, self.appended.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) => return Err(StreamError::Backend("stream closed".into())),
                Err(_) => return Ok(Vec::new()),
            }
        }
    }

    fn commit_async(&mut self) {
        if let Ok(mut committed) = self.stream.inner.committed.lock() {
            committed.insert(self.group_id.clone(), self.positions.clone());
        }
    }
}
