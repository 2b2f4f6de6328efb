//! Protocol upgrade tunnelling.
//!
//! # Responsibilities
//! - Relay the upstream's `101 Switching Protocols` to the client
//! - Splice the two upgraded connections together
//!
//! # Data Flow
//! ```text
//! Client ←──── raw bytes ────→ Proxy ←──── raw bytes ────→ Upstream
//! ```
//!
//! # Design Decisions
//! - Bytes are copied as they arrive; no framing is parsed, so SPDY
//!   (`kubectl exec`, `port-forward`) and WebSocket both pass
//! - Tunnelled bytes never reach the enrichment pipeline

use axum::body::Body;
use axum::response::Response;
use hyper::body::Incoming;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;

use crate::http::request::{restore_upgrade, strip_hop_by_hop, upgrade_protocol};

/// Response head sent to the client when the upstream switched protocols.
pub fn switching_protocols(upstream: hyper::Response<Incoming>) -> Response {
    let protocol = upgrade_protocol(upstream.headers());
    let (mut parts, _) = upstream.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    if let Some(protocol) = protocol {
        restore_upgrade(&mut parts.headers, protocol);
    }
    Response::from_parts(parts, Body::empty())
}

/// Wait for both sides to upgrade, then copy bytes until either closes.
pub async fn tunnel(client: OnUpgrade, upstream: OnUpgrade) {
    let (client, upstream) = match tokio::try_join!(client, upstream) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(error = %e, "Connection upgrade failed");
            return;
        }
    };

    let mut client = TokioIo::new(client);
    let mut upstream = TokioIo::new(upstream);
    match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
        Ok((sent, received)) => {
            tracing::debug!(sent, received, "Upgraded connection closed");
        }
        Err(e) => tracing::debug!(error = %e, "Upgraded connection ended"),
    }
}
