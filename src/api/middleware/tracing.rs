//! HTTP request/response tracing middleware.

use tower_http::LatencyUnit;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Creates a tracing middleware for HTTP requests.
///
/// Request spans are opened at `INFO` with method, URI and version. The URI
/// is logged as received, so a `jwt` query parameter never reaches these
/// routes: renewal tokens travel in the request body.
///
/// ```text
/// INFO request{method=POST uri=/api/renew-magic-link version=HTTP/1.1}: finished processing request latency=12 ms status=204
/// ```
pub fn layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
}
