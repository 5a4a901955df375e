// Correlation cache: records keyed by their write-time key, each with its own expiry.
//
// Purpose
// - Hold a time-bounded observation window over a stream for token lookups.
//
// Responsibilities
// - put and put_batch stamp expire_at = now + ttl and overwrite on key collision.
// - snapshot copies every entry still present; it does not filter on the clock.
// - cleanup removes entries with expire_at <= now and moves the watermark one interval ahead.
//
// Concurrency
// - Writes (put, put_batch, cleanup) take the write lock, snapshot takes the read lock.
// - Ingestion has a single writer, so writer contention is not optimized.

use crate::modules::correlation::core::record::Record;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: String,
    expire_at: Instant,
}

#[derive(Debug)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    next_cleanup_at: Instant,
}

#[derive(Debug)]
pub struct CorrelationCache {
    ttl: Duration,
    cleanup_interval: Duration,
    state: RwLock<CacheState>,
}

impl CorrelationCache {
    pub fn new(ttl: Duration, cleanup_interval: Duration) -> Self {
        Self {
            ttl,
            cleanup_interval,
            state: RwLock::new(CacheState {
                entries: HashMap::new(),
                next_cleanup_at: Instant::now() + cleanup_interval,
            }),
        }
    }

    pub async fn put(&self, record: Record) {
        self.put_batch([record]).await;
    }

    /// Inserts the whole batch under a single write lock acquisition.
    pub async fn put_batch(&self, records: impl IntoIterator<Item = Record>) -> usize {
        let mut state = self.state.write().await;
        let expire_at = Instant::now() + self.ttl;
        let mut stored = 0;
        for record in records {
            state.entries.insert(
                record.key,
                CacheEntry {
                    payload: record.payload,
                    expire_at,
                },
            );
            stored += 1;
        }
        stored
    }

    pub async fn snapshot(&self) -> Vec<Record> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .map(|(key, entry)| Record::new(key.clone(), entry.payload.clone()))
            .collect()
    }

    pub async fn cleanup(&self, now: Instant) -> usize {
        let mut state = self.state.write().await;
        self.evict(&mut state, now)
    }

    /// Runs cleanup only once the watermark has passed. Returns the number of
    /// evicted entries when a pass ran.
    pub async fn cleanup_if_due(&self, now: Instant) -> Option<usize> {
        if now <= self.state.read().await.next_cleanup_at {
            return None;
        }
        let mut state = self.state.write().await;
        if now <= state.next_cleanup_at {
            return None;
        }
        Some(self.evict(&mut state, now))
    }

    pub async fn next_cleanup_at(&self) -> Instant {
        self.state.read().await.next_cleanup_at
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn evict(&self, state: &mut CacheState, now: Instant) -> usize {
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.expire_at > now);
        state.next_cleanup_at = now + self.cleanup_interval;
        let after = state.entries.len();
        debug!(before, after, "reduced correlation cache");
        before - after
    }
}
