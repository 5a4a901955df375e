// Stream reader: drains the stream into the correlation cache until told to stop.
//
// Loop, once per iteration
// - Poll the stream for up to poll_timeout.
// - Commit consumption progress (fire-and-forget; redelivery only overwrites the same key).
// - Store the whole batch under one write lock.
// - Give the cache a chance to run its gated cleanup.
//
// Failure handling
// - A failed poll is logged and retried after an exponential backoff. The task is never restarted
//   from outside, so it must not die on a transport error.
// - Shutdown is observed while polling and while backing off.

use crate::modules::correlation::core::cache::CorrelationCache;
use crate::modules::correlation::core::record::Record;
use crate::modules::correlation::use_cases::ingest_stream::backoff::{Backoff, BackoffSettings};
use crate::shared::infrastructure::stream::StreamConsumer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub polls: u64,
    pub failed_polls: u64,
    pub batches: u64,
    pub records: u64,
    pub cleanups: u64,
    pub evicted: u64,
}

pub struct StreamReader {
    consumer: Box<dyn StreamConsumer>,
    cache: Arc<CorrelationCache>,
    poll_timeout: Duration,
    backoff: Backoff,
}

impl StreamReader {
    pub fn new(
        consumer: Box<dyn StreamConsumer>,
        cache: Arc<CorrelationCache>,
        poll_timeout: Duration,
        backoff: BackoffSettings,
    ) -> Self {
        Self {
            consumer,
            cache,
            poll_timeout,
            backoff: Backoff::new(backoff),
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> ReaderStats {
        let mut stats = ReaderStats::default();
        info!(poll_timeout_ms = self.poll_timeout.as_millis() as u64, "stream reader started");

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            debug!("polling stream");
            let polled = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                polled = self.consumer.poll(self.poll_timeout) => polled,
            };
            stats.polls += 1;

            match polled {
                Ok(batch) => {
                    self.backoff.reset();
                    self.consumer.commit_async();
                    if !batch.is_empty() {
                        for record in &batch {
                            debug!(
                                key = %record.key,
                                partition = record.partition,
                                offset = record.offset,
                                "storing record"
                            );
                        }
                        let stored = self
                            .cache
                            .put_batch(
                                batch
                                    .into_iter()
                                    .map(|record| Record::new(record.key, record.value)),
                            )
                            .await;
                        stats.batches += 1;
                        stats.records += stored as u64;
                    }
                }
                Err(error) => {
                    stats.failed_polls += 1;
                    let delay = self.backoff.next_delay();
                    warn!(
                        %error,
                        attempt = self.backoff.attempt(),
                        retry_in_ms = delay.as_millis() as u64,
                        "stream poll failed"
                    );
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                break;
                            }
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }

            if let Some(evicted) = self.cache.cleanup_if_due(Instant::now()).await {
                stats.cleanups += 1;
                stats.evicted += evicted as u64;
            }
        }

        info!(
            polls = stats.polls,
            failed_polls = stats.failed_polls,
            records = stats.records,
            evicted = stats.evicted,
            "stream reader stopped"
        );
        stats
    }
}
