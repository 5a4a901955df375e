use crate::modules::correlation::use_cases::query_by_token::observer::CorrelationObserver;
use crate::modules::events::use_cases::publish_events::publisher::EventPublisher;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<EventPublisher>,
    pub observer: Arc<CorrelationObserver>,
    pub fan_out_size: i32,
}
