use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::modules::correlation::use_cases::query_by_token::inbound::http as correlation_http;
use crate::modules::events::use_cases::publish_events::inbound::http as publish_http;
use crate::shell::state::AppState;
use crate::shell::trace::propagate_trace_id;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/dosomething", post(publish_http::handle))
        .route("/correlations/{trace_id}", get(correlation_http::handle))
        .route("/actuator/health", get(health))
        .with_state(state)
        .layer(middleware::from_fn(propagate_trace_id))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "UP" }))
}

#[cfg(test)]
mod shell_http_tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::router;
    use crate::shared::core::trace_id::TraceId;
    use crate::shared::infrastructure::stream::in_memory::InMemoryStream;
    use crate::shell::compose;
    use crate::shell::config::AppConfig;
    use crate::shell::trace::TRACE_ID_HEADER;

    fn app() -> axum::Router {
        let config = AppConfig {
            padding_size: 8,
            ..AppConfig::default()
        };
        router(compose(&config, InMemoryStream::new("eventsource", 10)))
    }

    #[tokio::test]
    async fn it_should_report_up_on_the_health_endpoint() {
        let response = app()
            .oneshot(Request::get("/actuator/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "UP");
    }

    #[tokio::test]
    async fn it_should_return_a_new_trace_id_header() {
        let response = app()
            .oneshot(Request::post("/dosomething").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let header = response.headers().get(TRACE_ID_HEADER).unwrap();
        assert!(TraceId::parse(header.to_str().unwrap()).is_some());
    }

    #[tokio::test]
    async fn it_should_reuse_a_valid_incoming_trace_id() {
        let response = app()
            .oneshot(
                Request::post("/dosomething")
                    .header(TRACE_ID_HEADER, "463ac35c9f6413ad")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[TRACE_ID_HEADER], "463ac35c9f6413ad");
    }

    #[tokio::test]
    async fn it_should_replace_an_invalid_incoming_trace_id() {
        let response = app()
            .oneshot(
                Request::get("/actuator/health")
                    .header(TRACE_ID_HEADER, "not-a-trace-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let header = response.headers()[TRACE_ID_HEADER].to_str().unwrap();
        assert_ne!(header, "not-a-trace-id");
        assert!(TraceId::parse(header).is_some());
    }

    #[tokio::test]
    async fn it_should_return_404_for_unknown_routes() {
        let response = app()
            .oneshot(Request::get("/nothing-here").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
