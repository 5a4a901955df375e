// Shared setup for the end to end flow tests.
//
// Responsibilities when you add code
// - Build the full router over an in-memory stream with short windows.
// - Keep windows short enough that a failing test still finishes quickly.

#![allow(dead_code)]

use axum::{Router, body::Body, http::Request};
use event_correlation::shared::infrastructure::stream::in_memory::InMemoryStream;
use event_correlation::shell::config::AppConfig;
use event_correlation::shell::state::AppState;
use event_correlation::shell::trace::TRACE_ID_HEADER;
use event_correlation::shell::{compose, http};
use http_body_util::BodyExt;
use std::time::Duration;
use tower::ServiceExt;

pub fn make_test_config() -> AppConfig {
    AppConfig {
        partitions: 4,
        poll_timeout: Duration::from_millis(20),
        observation_window: Duration::from_millis(500),
        settle_interval: Duration::from_millis(10),
        padding_size: 32,
        noise_interval: None,
        ..AppConfig::default()
    }
}

pub fn make_app(config: &AppConfig) -> (Router, AppState, InMemoryStream) {
    let stream = InMemoryStream::with_retention(
        config.topic.clone(),
        config.partitions,
        config.stream_retention,
    );
    let state = compose(config, stream.clone());
    (http::router(state.clone()), state, stream)
}

/// Posts to /dosomething and returns the trace id header of the response.
pub async fn do_something(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(Request::post("/dosomething").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.status().is_success());
    response.headers()[TRACE_ID_HEADER]
        .to_str()
        .unwrap()
        .to_string()
}

pub async fn get_json(app: &Router, uri: &str) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.status().is_success());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn wait_for_stream_len(stream: &InMemoryStream, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while stream.len().await < expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("stream never reached the expected size");
}
