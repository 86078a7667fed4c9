//! Request handling shared by both listeners.
//!
//! # Responsibilities
//! - Extract the requested host (routing key)
//! - Attach request IDs and tracing spans
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - An incoming `x-request-id` is kept rather than replaced

use axum::http::{header, Request};
use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// The host a request is addressed to.
///
/// Absolute-form request targets win over the `Host` header, as HTTP/1.1
/// requires. The result may still carry a port.
pub fn request_host<B>(request: &Request<B>) -> Option<&str> {
    request.uri().host().or_else(|| {
        request
            .headers()
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
    })
}

/// Wrap a router with the request ID and tracing layers.
pub fn with_request_layers(router: Router) -> Router {
    router
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
