//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! client request
//!     → server.rs (Axum catch-all, trace + timeout layers)
//!     → request.rs (map URI onto target, strip hop-by-hop, X-Forwarded-For)
//!     → upstream (hyper client)
//!     → upgrade.rs (101: splice client and upstream connections)
//!     → response.rs (buffer, decode via encoding.rs, enrich, re-frame)
//!     → client response
//! ```

pub mod encoding;
pub mod request;
pub mod response;
pub mod server;
pub mod upgrade;

pub use encoding::{Codec, ContentEncoding, EncodingError};
pub use request::Target;
pub use response::{InterceptError, Outcome, ResponseInterceptor};
pub use server::{HttpServer, ServerError};
