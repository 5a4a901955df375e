// Background noise: one unrelated event under a fresh trace id on every tick.
//
// Purpose
// - Keep other traffic flowing through the stream so correlation has something to filter out.

use crate::modules::events::core::event::NOISE_SEQUENCE_ID;
use crate::modules::events::use_cases::publish_events::publisher::EventPublisher;
use crate::shared::core::trace_id::TraceId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};
use uuid::Uuid;

/// Runs until shutdown is signalled and returns how many noise events were attempted.
/// Publishes run on their own tasks so a stuck send never delays the next tick or shutdown;
/// sends still in flight at shutdown are abandoned.
pub async fn make_noise(
    publisher: Arc<EventPublisher>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight = JoinSet::new();
    let mut published = 0;
    info!(interval_ms = every.as_millis() as u64, "noise maker started");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                while in_flight.try_join_next().is_some() {}
                debug!("making some noise");
                let publisher = Arc::clone(&publisher);
                let trace_id = TraceId::generate();
                in_flight.spawn(async move {
                    publisher
                        .publish(trace_id.as_str(), Uuid::new_v4(), NOISE_SEQUENCE_ID)
                        .await
                });
                published += 1;
            }
        }
    }

    info!(published, abandoned = in_flight.len(), "noise maker stopped");
    published
}

#[cfg(test)]
mod make_noise_tests {
    use super::*;
    use crate::modules::events::core::event::Event;
    use crate::shared::infrastructure::stream::StreamConnector;
    use crate::shared::infrastructure::stream::in_memory::InMemoryStream;
    use crate::tests::fixtures::publisher::{TOPIC, make_publisher_settings};
    use rstest::rstest;

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn it_should_publish_noise_on_every_tick_until_shutdown() {
        let stream = InMemoryStream::new(TOPIC, 4);
        let publisher = Arc::new(EventPublisher::new(
            Arc::new(stream.clone()),
            make_publisher_settings(4),
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(make_noise(publisher, Duration::from_secs(3), shutdown_rx));

        tokio::time::sleep(Duration::from_millis(7_500)).await;
        shutdown_tx.send(true).unwrap();
        let published = handle.await.unwrap();
        assert_eq!(published, 3);

        let mut consumer = stream.connect("noise-tests");
        let records = consumer.poll(Duration::from_millis(10)).await.unwrap();
        assert_eq!(records.len(), 3);
        let trace_ids: std::collections::HashSet<String> = records
            .iter()
            .map(|r| serde_json::from_str::<Event>(&r.value).unwrap())
            .inspect(|event| assert!(event.is_noise()))
            .map(|event| event.metadata.trace_id)
            .collect();
        assert_eq!(trace_ids.len(), 3);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_stop_promptly_while_a_send_is_stuck() {
        let stream = InMemoryStream::new(TOPIC, 4);
        stream.set_delay_send_ms(60_000);
        let publisher = Arc::new(EventPublisher::new(
            Arc::new(stream.clone()),
            make_publisher_settings(4),
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(make_noise(publisher, Duration::from_millis(10), shutdown_rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        let stopped = tokio::time::timeout(Duration::from_millis(500), handle).await;

        let published = stopped.expect("noise maker waited for a stuck send").unwrap();
        assert!(published >= 1);
        assert!(stream.is_empty().await);
    }
}
