//! Plain HTTP redirect listener.
//!
//! Every request is answered from the redirect map: `307` with a `Location`
//! header for known hosts, `404` for everything else.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};

use crate::http::request::{request_host, with_request_layers};
use crate::observability::metrics;
use crate::routing::RouteStore;

#[derive(Clone)]
pub struct RedirectState {
    routes: Arc<RouteStore>,
}

/// Build the redirect router.
pub fn router(routes: Arc<RouteStore>) -> Router {
    let app = Router::new()
        .fallback(redirect_handler)
        .with_state(RedirectState { routes });
    with_request_layers(app)
}

async fn redirect_handler(State(state): State<RedirectState>, request: Request<Body>) -> Response {
    let host = request_host(&request);
    // Clone out so the snapshot is released before building the response.
    let location = host.and_then(|host| state.routes.load().location_for(host).cloned());

    match location {
        Some(location) => {
            tracing::debug!(host = host.unwrap_or_default(), location = ?location, "Redirecting");
            metrics::record_request(metrics::HTTP_LISTENER, StatusCode::TEMPORARY_REDIRECT);
            (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)]).into_response()
        }
        None => {
            tracing::debug!(host = host.unwrap_or("<none>"), "No redirect for host");
            metrics::record_request(metrics::HTTP_LISTENER, StatusCode::NOT_FOUND);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
