use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::sync::Arc;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use crate::shared::core::trace_id::TraceId;
use crate::shell::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub transaction_id: Uuid,
}

/// Starts a transaction and publishes its events in the background. The
/// response does not wait for the broker.
pub async fn handle(
    State(state): State<AppState>,
    Extension(trace_id): Extension<TraceId>,
) -> impl IntoResponse {
    let transaction_id = Uuid::new_v4();
    let publisher = Arc::clone(&state.publisher);
    let count = state.fan_out_size;
    let span = info_span!("fan_out", trace_id = %trace_id, %transaction_id);

    tokio::spawn(
        async move {
            let outcomes = publisher
                .fan_out(trace_id.as_str(), transaction_id, count)
                .await;
            let failed = outcomes.iter().filter(|outcome| !outcome.is_ok()).count();
            if failed > 0 {
                warn!(failed, published = outcomes.len() - failed, "fan-out incomplete");
            } else {
                debug!(published = outcomes.len(), "fan-out complete");
            }
        }
        .instrument(span),
    );

    (StatusCode::OK, Json(TransactionResponse { transaction_id }))
}

#[cfg(test)]
mod publish_events_http_inbound_tests {
    use axum::{
        Extension, Router,
        body::Body,
        http::{Request, StatusCode},
        routing::post,
    };
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    use super::handle;
    use crate::shared::core::trace_id::TraceId;
    use crate::shared::infrastructure::stream::in_memory::InMemoryStream;
    use crate::shell::config::AppConfig;
    use crate::shell::compose;

    fn app(stream: InMemoryStream, trace_id: TraceId) -> Router {
        let config = AppConfig {
            padding_size: 8,
            ..AppConfig::default()
        };
        Router::new()
            .route("/dosomething", post(handle))
            .layer(Extension(trace_id))
            .with_state(compose(&config, stream))
    }

    #[tokio::test]
    async fn it_should_return_200_with_a_transaction_id() {
        let stream = InMemoryStream::new("eventsource", 10);
        let response = app(stream, TraceId::generate())
            .oneshot(Request::post("/dosomething").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let transaction_id = json.get("transactionId").and_then(|v| v.as_str()).unwrap();
        assert!(uuid::Uuid::parse_str(transaction_id).is_ok());
    }

    #[tokio::test]
    async fn it_should_publish_the_fan_out_in_the_background() {
        let stream = InMemoryStream::new("eventsource", 10);
        app(stream.clone(), TraceId::generate())
            .oneshot(Request::post("/dosomething").body(Body::empty()).unwrap())
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while stream.len().await < 5 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("fan-out never reached the stream");
        assert_eq!(stream.len().await, 5);
    }
}
