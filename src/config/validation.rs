//! Configuration validation.
//!
//! Serde handles syntax; this checks values before the config is accepted.
//! Every problem is reported, not just the first.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("proxy.target_url {url:?} is not a valid URL: {reason}")]
    InvalidTargetUrl { url: String, reason: String },

    #[error("proxy.target_url {0:?} must use the http scheme")]
    UnsupportedScheme(String),

    #[error("proxy.target_url {0:?} has no host")]
    MissingHost(String),

    #[error("{field} {value:?} is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.proxy.target_url) {
        Ok(url) => {
            if url.scheme() != "http" {
                errors.push(ValidationError::UnsupportedScheme(
                    config.proxy.target_url.clone(),
                ));
            }
            if url.host_str().map_or(true, str::is_empty) {
                errors.push(ValidationError::MissingHost(config.proxy.target_url.clone()));
            }
        }
        Err(e) => errors.push(ValidationError::InvalidTargetUrl {
            url: config.proxy.target_url.clone(),
            reason: e.to_string(),
        }),
    }

    if config.proxy.listen_addr.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "proxy.listen_addr",
            value: config.proxy.listen_addr.clone(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.connect_secs"));
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_body_bytes"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
