//! Request handling and transformation.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the upstream target (path and query kept)
//! - Strip hop-by-hop headers in both directions
//! - Append the client address to `X-Forwarded-For`
//! - Keep `Connection: upgrade` and `Upgrade` on upgrade requests
//!
//! # Design Decisions
//! - The request body is streamed, never buffered
//! - `Host` is dropped so the client derives it from the upstream authority

use std::net::IpAddr;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, Uri};
use url::Url;

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Parsed upstream base URL.
#[derive(Debug, Clone)]
pub struct Target {
    scheme: String,
    authority: String,
    path: String,
    query: Option<String>,
}

impl Target {
    pub fn parse(target_url: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(target_url)?;
        let host = url.host_str().ok_or(url::ParseError::EmptyHost)?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self {
            scheme: url.scheme().to_string(),
            authority,
            path: url.path().to_string(),
            query: url.query().map(str::to_string),
        })
    }

    /// Map an inbound URI onto the target.
    pub fn upstream_uri(&self, inbound: &Uri) -> Result<Uri, axum::http::Error> {
        let path = join_paths(&self.path, inbound.path());
        let query = match (self.query.as_deref(), inbound.query()) {
            (Some(t), Some(r)) if !t.is_empty() && !r.is_empty() => Some(format!("{}&{}", t, r)),
            (Some(t), _) if !t.is_empty() => Some(t.to_string()),
            (_, Some(r)) if !r.is_empty() => Some(r.to_string()),
            _ => None,
        };

        let path_and_query = match query {
            Some(q) => format!("{}?{}", path, q),
            None => path,
        };

        Uri::builder()
            .scheme(self.scheme.as_str())
            .authority(self.authority.as_str())
            .path_and_query(path_and_query)
            .build()
    }
}

/// Join two paths with exactly one slash between them.
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in &listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// The requested protocol when `headers` ask for a connection upgrade.
pub fn upgrade_protocol(headers: &HeaderMap) -> Option<HeaderValue> {
    let wants_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));
    if !wants_upgrade {
        return None;
    }
    headers.get(header::UPGRADE).cloned()
}

/// Put back the upgrade headers removed by [`strip_hop_by_hop`].
pub fn restore_upgrade(headers: &mut HeaderMap, protocol: HeaderValue) {
    headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
    headers.insert(header::UPGRADE, protocol);
}

/// Append `client` to the `X-Forwarded-For` chain.
pub fn append_forwarded_for(headers: &mut HeaderMap, client: IpAddr) {
    let chain = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) if !prior.is_empty() => format!("{}, {}", prior, client),
        _ => client.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&chain) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

/// Turn an inbound request into the request sent upstream.
pub fn upstream_request(
    target: &Target,
    request: Request<Body>,
    client: IpAddr,
) -> Result<Request<Body>, axum::http::Error> {
    let (mut parts, body) = request.into_parts();

    parts.uri = target.upstream_uri(&parts.uri)?;
    let upgrade = upgrade_protocol(&parts.headers);
    strip_hop_by_hop(&mut parts.headers);
    if let Some(protocol) = upgrade {
        restore_upgrade(&mut parts.headers, protocol);
    }
    parts.headers.remove(header::HOST);
    append_forwarded_for(&mut parts.headers, client);

    Ok(Request::from_parts(parts, body))
}
