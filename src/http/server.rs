//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a catch-all proxy handler
//! - Wire up middleware (tracing, request timeout)
//! - Forward requests to the single upstream target
//! - Run every upstream response through the [`ResponseInterceptor`]
//! - Hand upgraded connections to the tunnel in `upgrade.rs`
//! - Record request metrics

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::enrich::EnrichmentRegistry;
use crate::http::request::{strip_hop_by_hop, upgrade_protocol, upstream_request, Target};
use crate::http::response::ResponseInterceptor;
use crate::http::upgrade;
use crate::lifecycle::shutdown::wait as wait_for_shutdown;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid target url: {0}")]
    Target(#[from] url::ParseError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub target: Arc<Target>,
    pub client: Client<HttpConnector, Body>,
    pub interceptor: ResponseInterceptor,
}

/// HTTP server for the enriching proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server enriching the built-in kinds.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        Self::with_registry(config, Arc::new(EnrichmentRegistry::builtin()))
    }

    /// Create a server with an explicit registry.
    pub fn with_registry(
        config: ProxyConfig,
        registry: Arc<EnrichmentRegistry>,
    ) -> Result<Self, ServerError> {
        let target = Arc::new(Target::parse(&config.proxy.target_url)?);

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = AppState {
            target,
            client,
            interceptor: ResponseInterceptor::new(registry, config.limits.max_body_bytes),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            target = %self.config.proxy.target_url,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Forward one request and rewrite its response.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let client_upgrade = upgrade_protocol(request.headers())
        .is_some()
        .then(|| hyper::upgrade::on(&mut request));

    let upstream = match upstream_request(&state.target, request, peer.ip()) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!(error = %e, "Cannot map request onto target");
            metrics::record_request(method.as_str(), 400, start);
            return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
        }
    };

    tracing::debug!(
        method = %upstream.method(),
        uri = %upstream.uri(),
        headers = upstream.headers().len(),
        "Forwarding request"
    );

    let mut response = match state.client.request(upstream).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Upstream error");
            metrics::record_request(method.as_str(), 502, start);
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    let status = response.status();
    if status == StatusCode::SWITCHING_PROTOCOLS {
        let Some(client_upgrade) = client_upgrade else {
            tracing::error!("Upstream switched protocols without an upgrade request");
            metrics::record_request(method.as_str(), 502, start);
            return (StatusCode::BAD_GATEWAY, "Unexpected protocol switch").into_response();
        };
        tokio::spawn(upgrade::tunnel(client_upgrade, hyper::upgrade::on(&mut response)));
        metrics::record_request(method.as_str(), status.as_u16(), start);
        return upgrade::switching_protocols(response);
    }

    let response = into_axum_response(response);

    if !carries_body(&method, status) {
        metrics::record_request(method.as_str(), status.as_u16(), start);
        return response;
    }

    match state.interceptor.intercept(response).await {
        Ok(response) => {
            metrics::record_request(method.as_str(), status.as_u16(), start);
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to read upstream response");
            metrics::record_request(method.as_str(), 502, start);
            (StatusCode::BAD_GATEWAY, "Upstream response unreadable").into_response()
        }
    }
}

/// Drop hop-by-hop headers and box the streaming body.
fn into_axum_response(response: hyper::Response<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

/// Responses that never carry a body are forwarded untouched.
fn carries_body(method: &Method, status: StatusCode) -> bool {
    *method != Method::HEAD
        && !status.is_informational()
        && status != StatusCode::NO_CONTENT
        && status != StatusCode::NOT_MODIFIED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carries_body() {
        assert!(carries_body(&Method::GET, StatusCode::OK));
        assert!(carries_body(&Method::POST, StatusCode::NOT_FOUND));
        assert!(!carries_body(&Method::HEAD, StatusCode::OK));
        assert!(!carries_body(&Method::GET, StatusCode::NO_CONTENT));
        assert!(!carries_body(&Method::GET, StatusCode::NOT_MODIFIED));
    }

    #[test]
    fn test_new_rejects_bad_target() {
        let mut config = ProxyConfig::default();
        config.proxy.target_url = "::not a url::".into();

        assert!(matches!(HttpServer::new(config), Err(ServerError::Target(_))));
    }
}
