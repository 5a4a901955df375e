// Trace id propagation for inbound requests.
//
// Responsibilities
// - Reuse a valid incoming x-b3-traceid header, otherwise start a new trace.
// - Expose the trace id to handlers through request extensions.
// - Echo the trace id on the response so callers can correlate what the request published.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::{Instrument, debug, info_span};

use crate::shared::core::trace_id::TraceId;

pub const TRACE_ID_HEADER: &str = "x-b3-traceid";

pub async fn propagate_trace_id(mut request: Request, next: Next) -> Response {
    let trace_id = request
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(TraceId::parse)
        .unwrap_or_else(TraceId::generate);

    debug!(%trace_id, "setting {TRACE_ID_HEADER}");
    request.extensions_mut().insert(trace_id.clone());

    let span = info_span!("request", trace_id = %trace_id);
    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(trace_id.as_str()) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}
