//! Kubernetes API reverse proxy that adds kubectl display columns.
//!
//! # Architecture Overview
//!
//! ```text
//!     client ──▶ http::server ──▶ http::request ──▶ Kubernetes API
//!                                                        │
//!     client ◀── http::response ◀── enrich ◀── printers ◀┘
//! ```
//!
//! Recognized objects (and every item of a recognized list) gain a
//! `"kubectl"` field holding the columns `kubectl get` would print, keyed
//! by upper-snake-case column name. Anything else, including every
//! failure, is forwarded byte for byte.

// Core subsystems
pub mod config;
pub mod enrich;
pub mod http;
pub mod printers;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use enrich::EnrichmentRegistry;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
