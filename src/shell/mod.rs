// Composition root.
//
// Responsibilities
// - Read config from environment (config.rs).
// - Wire the stream into the publisher and the correlation observer.
// - Spawn background workers and expose the HTTP router to main.

pub mod config;
pub mod http;
pub mod state;
pub mod trace;
pub mod workers;

use crate::modules::correlation::use_cases::query_by_token::observer::CorrelationObserver;
use crate::modules::events::use_cases::publish_events::publisher::EventPublisher;
use crate::shared::infrastructure::stream::in_memory::InMemoryStream;
use crate::shell::config::AppConfig;
use crate::shell::state::AppState;
use std::sync::Arc;

pub fn compose(config: &AppConfig, stream: InMemoryStream) -> AppState {
    let publisher = Arc::new(EventPublisher::new(
        Arc::new(stream.clone()),
        config.publisher_settings(),
    ));
    let observer = Arc::new(CorrelationObserver::new(
        Arc::new(stream),
        config.observer_settings(),
    ));
    AppState {
        publisher,
        observer,
        fan_out_size: config.fan_out_size,
    }
}
