//! HTTPS reverse proxy.
//!
//! # Responsibilities
//! - Pick the backend for a request from the routing snapshot (director)
//! - Forward the request once, without retries
//! - Stream the backend response back unmodified
//!
//! # Design Decisions
//! - The director is a pure function of the request URI and the matched
//!   target; it holds no state and never blocks
//! - Unknown hosts are sent to an empty target, which the transport rejects,
//!   so they surface as the same 502 as an unreachable backend
//! - Hop-by-hop headers are dropped in both directions, `Host` is kept

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{
        uri::{Parts, PathAndQuery},
        HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Uri, Version,
    },
    response::{IntoResponse, Response},
    Router,
};
use hyper::header;
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::http::request::{request_host, with_request_layers};
use crate::observability::metrics;
use crate::routing::{ProxyTarget, RouteStore};

/// Outbound HTTP(S) client used for every forwarded request.
pub type ProxyClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Headers that only apply to a single connection.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("proxy-connection"),
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
];

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// The forwarded request could not be completed.
#[derive(Debug, Error)]
#[error("upstream request for {host} failed: {source}")]
pub struct UpstreamError {
    host: String,
    #[source]
    source: hyper_util::client::legacy::Error,
}

impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        tracing::warn!(host = %self.host, error = %self.source, "Upstream request failed");
        metrics::record_request(metrics::HTTPS_LISTENER, StatusCode::BAD_GATEWAY);
        StatusCode::BAD_GATEWAY.into_response()
    }
}

#[derive(Clone)]
pub struct ProxyState {
    routes: Arc<RouteStore>,
    client: ProxyClient,
}

/// Build the outbound client.
pub fn build_client(connect_timeout: Duration) -> Result<ProxyClient, rustls::Error> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(connect_timeout));

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(rustls::crypto::aws_lc_rs::default_provider())?
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);

    Ok(Client::builder(TokioExecutor::new()).build(https))
}

/// Build the proxy router.
pub fn router(routes: Arc<RouteStore>, client: ProxyClient) -> Router {
    let app = Router::new()
        .fallback(proxy_handler)
        .with_state(ProxyState { routes, client });
    with_request_layers(app)
}

/// Rewrite a request target for the matched backend.
///
/// With a target, scheme and authority are replaced and path and query are
/// kept. Without one, scheme and authority are removed, leaving a target the
/// transport cannot connect to.
pub fn direct(uri: &Uri, target: Option<&ProxyTarget>) -> Uri {
    let mut parts = uri.clone().into_parts();
    match target {
        Some(target) => {
            parts.scheme = Some(target.scheme().clone());
            parts.authority = Some(target.authority().clone());
            if parts.path_and_query.is_none() {
                parts.path_and_query = Some(PathAndQuery::from_static("/"));
            }
        }
        None => {
            parts.scheme = None;
            parts.authority = None;
        }
    }
    Uri::from_parts(parts).unwrap_or_else(|_| origin_form(uri))
}

fn origin_form(uri: &Uri) -> Uri {
    let mut parts = Parts::default();
    parts.path_and_query = uri.path_and_query().cloned();
    Uri::from_parts(parts).unwrap_or_default()
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    // `Upgrade` is only meaningful with `Connection: upgrade`, dropped above.
    headers.remove(header::UPGRADE);
}

/// Append the client address to `X-Forwarded-For`.
pub fn append_forwarded_for(headers: &mut HeaderMap, client: SocketAddr) {
    let client = client.ip().to_string();
    let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) if !prior.is_empty() => format!("{prior}, {client}"),
        _ => client,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

async fn proxy_handler(
    State(state): State<ProxyState>,
    request: Request<Body>,
) -> Result<Response, UpstreamError> {
    let host = request_host(&request).unwrap_or_default().to_owned();
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (mut parts, body) = request.into_parts();
    // Snapshot only for the lookup and rewrite.
    parts.uri = direct(&parts.uri, state.routes.load().proxy_for(&host));
    parts.version = Version::HTTP_11;
    strip_hop_by_hop(&mut parts.headers);
    if let Some(addr) = client_addr {
        append_forwarded_for(&mut parts.headers, addr);
    }

    tracing::debug!(host = %host, upstream = %parts.uri, "Forwarding request");

    let response = state
        .client
        .request(Request::from_parts(parts, body))
        .await
        .map_err(|source| UpstreamError { host, source })?;

    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    metrics::record_request(metrics::HTTPS_LISTENER, parts.status);

    Ok(Response::from_parts(parts, Body::new(body)))
}
