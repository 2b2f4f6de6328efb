//! Response handling and transformation.
//!
//! # Responsibilities
//! - Buffer the upstream body and run the enrichment transform on it
//! - Fall back to the original bytes on any transform failure
//! - Recompute `Content-Length` for whichever body is sent
//!
//! # Design Decisions
//! - Status, timing and every other header are left as received
//! - Compressed bodies are decoded first (capped at the body limit) and
//!   re-encoded with the same codec
//! - Only a failed body read is an error; the server maps it to 502

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Response};
use thiserror::Error;

use crate::enrich::{transform_body, EnrichmentRegistry, TransformError};
use crate::http::encoding::ContentEncoding;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum InterceptError {
    #[error("read upstream body: {0}")]
    BodyRead(#[source] axum::Error),
}

/// What happened to one response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The body was rewritten with display fields.
    Enriched,
    /// Nothing to enrich; original bytes sent.
    PassedThrough,
    /// Enrichment failed; original bytes sent.
    FellBack,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Enriched => "enriched",
            Outcome::PassedThrough => "passthrough",
            Outcome::FellBack => "fallback",
        }
    }
}

/// Rewrites upstream responses. Shared across requests; holds no mutable state.
#[derive(Debug, Clone)]
pub struct ResponseInterceptor {
    registry: Arc<EnrichmentRegistry>,
    max_body_bytes: usize,
}

impl ResponseInterceptor {
    pub fn new(registry: Arc<EnrichmentRegistry>, max_body_bytes: usize) -> Self {
        Self {
            registry,
            max_body_bytes,
        }
    }

    /// Buffer, transform and re-frame one upstream response.
    pub async fn intercept(&self, response: Response<Body>) -> Result<Response<Body>, InterceptError> {
        let (mut parts, body) = response.into_parts();
        let original = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(InterceptError::BodyRead)?;

        let encoding = ContentEncoding::from_headers(&parts.headers);
        let (outgoing, outcome) = self.rewrite_body(original, &encoding);
        metrics::record_enrichment(outcome.as_str());

        parts.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(outgoing.len()));
        Ok(Response::from_parts(parts, Body::from(outgoing)))
    }

    /// Choose the bytes to send for `original`.
    pub fn rewrite_body(&self, original: Bytes, encoding: &ContentEncoding) -> (Bytes, Outcome) {
        let (decoded, codec) = match encoding.decode(&original, self.max_body_bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::trace!(error = %e, "Body not decodable, passing through");
                return (original, Outcome::PassedThrough);
            }
        };

        let enriched = match transform_body(&self.registry, &decoded) {
            Ok(enriched) => enriched,
            Err(TransformError::NotApplicable) => return (original, Outcome::PassedThrough),
            Err(e) => {
                match &e {
                    TransformError::PartialFailure { kind, source } => {
                        tracing::error!(kind = %kind, error = %source, "Enrichment failed, forwarding original body");
                    }
                    _ => tracing::error!(error = %e, "Enrichment failed, forwarding original body"),
                }
                return (original, Outcome::FellBack);
            }
        };

        match codec.encode(&enriched) {
            Ok(encoded) => (Bytes::from(encoded), Outcome::Enriched),
            Err(e) => {
                tracing::error!(error = %e, "Re-encoding enriched body failed, forwarding original body");
                (original, Outcome::FellBack)
            }
        }
    }
}
