//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Redirect targets are absolute URLs
//! - Redirect and proxy hostnames are unique after normalization
//! - Certificate and key paths come in pairs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RedirectorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is handed to the routing table builder
//! - Target URLs of proxy entries are checked by the builder, which owns the
//!   parsed form

use std::collections::HashSet;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::schema::RedirectorConfig;
use crate::routing::normalize_host;

/// A single semantic problem found in a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("redirect with empty hostname")]
    EmptyRedirectHost,

    #[error("redirect for {host} has an invalid target {target:?}: {reason}")]
    InvalidRedirectTarget {
        host: String,
        target: String,
        reason: String,
    },

    /// Keys are compared after `normalize_host`.
    #[error("redirect hostname {host} is configured more than once")]
    DuplicateRedirectHost { host: String },

    #[error("proxy entry #{index} has an empty incoming hostname")]
    EmptyIncoming { index: usize },

    #[error("proxy hostname {host} is configured more than once")]
    DuplicateIncoming { host: String },

    #[error("{context} sets {present:?} without its {missing}")]
    UnpairedCertificate {
        context: String,
        present: PathBuf,
        missing: &'static str,
    },

    #[error("listener.shutdown_timeout_secs must be greater than zero")]
    ZeroShutdownTimeout,
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &RedirectorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.shutdown_timeout_secs == 0 {
        errors.push(ValidationError::ZeroShutdownTimeout);
    }

    let mut redirect_hosts = HashSet::new();
    for (host, target) in &config.redirects {
        if host.trim().is_empty() {
            errors.push(ValidationError::EmptyRedirectHost);
            continue;
        }
        let normalized = normalize_host(host);
        if !redirect_hosts.insert(normalized.clone()) {
            errors.push(ValidationError::DuplicateRedirectHost { host: normalized });
        }
        let reason = match url::Url::parse(target) {
            Err(e) => Some(e.to_string()),
            // Served verbatim as the Location header.
            Ok(_) if axum::http::HeaderValue::from_str(target).is_err() => {
                Some("not a valid header value".to_string())
            }
            Ok(_) => None,
        };
        if let Some(reason) = reason {
            errors.push(ValidationError::InvalidRedirectTarget {
                host: host.clone(),
                target: target.clone(),
                reason,
            });
        }
    }

    let proxy = &config.https_proxy;
    check_pair(
        &mut errors,
        "https_proxy",
        proxy.default_cert.as_ref(),
        proxy.default_key.as_ref(),
        ("default_cert", "default_key"),
    );

    let mut seen = HashSet::new();
    for (index, entry) in proxy.entries.iter().enumerate() {
        let incoming = entry.incoming.trim();
        if incoming.is_empty() {
            errors.push(ValidationError::EmptyIncoming { index });
        } else if !seen.insert(normalize_host(incoming)) {
            errors.push(ValidationError::DuplicateIncoming {
                host: incoming.to_string(),
            });
        }

        check_pair(
            &mut errors,
            &format!("proxy entry {}", entry.incoming),
            entry.cert.as_ref(),
            entry.key.as_ref(),
            ("cert", "key"),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_pair(
    errors: &mut Vec<ValidationError>,
    context: &str,
    cert: Option<&PathBuf>,
    key: Option<&PathBuf>,
    names: (&'static str, &'static str),
) {
    match (cert, key) {
        (Some(cert), None) => errors.push(ValidationError::UnpairedCertificate {
            context: context.to_string(),
            present: cert.clone(),
            missing: names.1,
        }),
        (None, Some(key)) => errors.push(ValidationError::UnpairedCertificate {
            context: context.to_string(),
            present: key.clone(),
            missing: names.0,
        }),
        _ => {}
    }
}
