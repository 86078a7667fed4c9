//! The routing table and its builder.
//!
//! A [`RoutingTable`] is built in one go from configuration and never
//! mutated afterwards. Any error aborts the build so a half-populated table
//! can never be published.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::http::uri::{Authority, Scheme};
use axum::http::HeaderValue;
use rustls::sign::CertifiedKey;
use thiserror::Error;
use url::Url;

use crate::config::{CertificatePaths, ProxyEntryConfig, RedirectorConfig};
use crate::net::tls::{load_certified_key, CertificateError};

/// Reasons a routing table could not be built.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("redirect target {target:?} for {host} is not a valid Location header")]
    InvalidRedirectTarget { host: String, target: String },

    #[error("invalid target URL {target:?} for {host}: {reason}")]
    InvalidTargetUrl {
        host: String,
        target: String,
        reason: String,
    },

    #[error("failed to load certificate for {context}: {source}")]
    Certificate {
        context: String,
        #[source]
        source: CertificateError,
    },
}

/// Where a proxied hostname is forwarded to.
#[derive(Debug, Clone)]
pub struct ProxyTarget {
    url: Url,
    scheme: Scheme,
    authority: Authority,
    certificate: Option<Arc<CertifiedKey>>,
}

impl ProxyTarget {
    /// Parse a backend URL. Only `http` and `https` with a host are accepted.
    pub fn parse(host: &str, target: &str) -> Result<Self, BuildError> {
        let invalid = |reason: String| BuildError::InvalidTargetUrl {
            host: host.to_string(),
            target: target.to_string(),
            reason,
        };

        let url = Url::parse(target).map_err(|e| invalid(e.to_string()))?;
        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            other => return Err(invalid(format!("unsupported scheme {other:?}"))),
        };
        let backend_host = url
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let authority = match url.port() {
            Some(port) => format!("{backend_host}:{port}"),
            None => backend_host.to_string(),
        };
        let authority = Authority::from_str(&authority).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            url,
            scheme,
            authority,
            certificate: None,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn certificate(&self) -> Option<&Arc<CertifiedKey>> {
        self.certificate.as_ref()
    }
}

/// Immutable snapshot of all redirect and proxy routes.
#[derive(Debug, Default)]
pub struct RoutingTable {
    /// Prebuilt `Location` values.
    redirects: HashMap<String, HeaderValue>,
    proxies: HashMap<String, ProxyTarget>,
    default_certificate: Option<Arc<CertifiedKey>>,
}

impl RoutingTable {
    /// A table that routes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from a validated configuration document.
    pub fn from_config(config: &RedirectorConfig) -> Result<Self, BuildError> {
        let proxy = &config.https_proxy;
        Self::build(
            config
                .redirects
                .iter()
                .map(|(host, target)| (host.clone(), target.clone())),
            &proxy.entries,
            proxy.default_pair().as_ref(),
        )
    }

    /// Build a table from its parts.
    ///
    /// Redirects are applied in order, so a later pair for the same hostname
    /// replaces an earlier one. The same holds for proxy entries.
    pub fn build<R>(
        redirects: R,
        entries: &[ProxyEntryConfig],
        default_pair: Option<&CertificatePaths>,
    ) -> Result<Self, BuildError>
    where
        R: IntoIterator<Item = (String, String)>,
    {
        let mut locations = HashMap::new();
        for (host, target) in redirects {
            let location = HeaderValue::from_str(&target)
                .map_err(|_| BuildError::InvalidRedirectTarget {
                    host: host.clone(),
                    target: target.clone(),
                })?;
            locations.insert(normalize_host(&host), location);
        }

        let mut proxies = HashMap::with_capacity(entries.len());
        for entry in entries {
            let mut target = ProxyTarget::parse(&entry.incoming, &entry.target)?;
            if let Some(paths) = entry.certificate_pair() {
                let certificate =
                    load_certified_key(&paths).map_err(|source| BuildError::Certificate {
                        context: entry.incoming.clone(),
                        source,
                    })?;
                target.certificate = Some(certificate);
            }
            proxies.insert(normalize_host(&entry.incoming), target);
        }

        let default_certificate = default_pair
            .map(|paths| {
                load_certified_key(paths).map_err(|source| BuildError::Certificate {
                    context: "default certificate".to_string(),
                    source,
                })
            })
            .transpose()?;

        let table = Self {
            redirects: locations,
            proxies,
            default_certificate,
        };

        tracing::info!(
            redirects = table.redirect_count(),
            proxies = table.proxy_count(),
            default_certificate = table.default_certificate.is_some(),
            "Routing table built"
        );

        Ok(table)
    }

    /// Redirect target for a requested host.
    pub fn redirect_for(&self, host: &str) -> Option<&str> {
        self.location_for(host).and_then(|value| value.to_str().ok())
    }

    /// `Location` header value for a requested host.
    pub fn location_for(&self, host: &str) -> Option<&HeaderValue> {
        self.redirects.get(&normalize_host(host))
    }

    /// Backend for a requested host.
    pub fn proxy_for(&self, host: &str) -> Option<&ProxyTarget> {
        self.proxies.get(&normalize_host(host))
    }

    /// Certificate to present for a TLS server name.
    ///
    /// The entry's own certificate wins; any other case (unknown name, entry
    /// without certificate, no SNI at all) falls back to the default.
    pub fn certificate_for(&self, server_name: Option<&str>) -> Option<Arc<CertifiedKey>> {
        server_name
            .and_then(|name| self.proxy_for(name))
            .and_then(|target| target.certificate.clone())
            .or_else(|| self.default_certificate.clone())
    }

    pub fn redirect_count(&self) -> usize {
        self.redirects.len()
    }

    pub fn proxy_count(&self) -> usize {
        self.proxies.len()
    }

    pub fn has_default_certificate(&self) -> bool {
        self.default_certificate.is_some()
    }
}

/// Lowercase a host and drop any `:port` suffix.
///
/// Bracketed IPv6 literals keep their brackets.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let name = if host.starts_with('[') {
        match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        }
    } else {
        match host.rsplit_once(':') {
            Some((name, port))
                if !name.contains(':') && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) =>
            {
                name
            }
            _ => host,
        }
    };
    name.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_pair(dir: &TempDir, name: &str) -> CertificatePaths {
        let generated = rcgen::generate_simple_self_signed(vec![name.to_string()]).unwrap();
        let cert = dir.path().join(format!("{name}.pem"));
        let key = dir.path().join(format!("{name}.key"));
        std::fs::write(&cert, generated.cert.pem()).unwrap();
        std::fs::write(&key, generated.key_pair.serialize_pem()).unwrap();
        CertificatePaths { cert, key }
    }

    fn entry(incoming: &str, target: &str, paths: Option<&CertificatePaths>) -> ProxyEntryConfig {
        ProxyEntryConfig {
            incoming: incoming.to_string(),
            target: target.to_string(),
            cert: paths.map(|p| p.cert.clone()),
            key: paths.map(|p| p.key.clone()),
        }
    }

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter()
            .map(|(h, t)| (h.to_string(), t.to_string()))
            .collect()
    }

    #[test]
    fn later_redirect_for_same_host_wins() {
        let table = RoutingTable::build(
            pairs(&[
                ("a.example", "https://first"),
                ("b.example", "https://other"),
                ("A.EXAMPLE", "https://second"),
            ]),
            &[],
            None,
        )
        .unwrap();

        assert_eq!(table.redirect_count(), 2);
        assert_eq!(table.redirect_for("a.example"), Some("https://second"));
        assert_eq!(table.redirect_for("b.example"), Some("https://other"));
        assert_eq!(table.redirect_for("c.example"), None);
    }

    #[test]
    fn redirect_target_must_be_a_header_value() {
        let err = RoutingTable::build(pairs(&[("a.example", "https://up/\nx")]), &[], None)
            .unwrap_err();

        assert!(matches!(err, BuildError::InvalidRedirectTarget { ref host, .. } if host == "a.example"));
        assert_eq!(
            RoutingTable::build(pairs(&[("a.example", "https://up")]), &[], None)
                .unwrap()
                .location_for("A.EXAMPLE"),
            Some(&HeaderValue::from_static("https://up"))
        );
    }

    #[test]
    fn host_lookup_ignores_case_and_port() {
        let table = RoutingTable::build(pairs(&[("a.example", "https://up")]), &[], None).unwrap();

        assert_eq!(table.redirect_for("A.Example:8080"), Some("https://up"));
        assert_eq!(table.redirect_for("a.example:"), None);
    }

    #[test]
    fn normalize_host_handles_ipv6() {
        assert_eq!(normalize_host("[::1]:8443"), "[::1]");
        assert_eq!(normalize_host("[::1]"), "[::1]");
        assert_eq!(normalize_host("::1"), "::1");
        assert_eq!(normalize_host("Host.LAN"), "host.lan");
    }

    #[test]
    fn proxy_target_keeps_scheme_host_and_port() {
        let table = RoutingTable::build(
            Vec::new(),
            &[
                entry("b.example", "http://10.0.0.5:9000", None),
                entry("c.example", "https://backend.lan/ignored/path", None),
            ],
            None,
        )
        .unwrap();

        let b = table.proxy_for("b.example").unwrap();
        assert_eq!(b.scheme(), &Scheme::HTTP);
        assert_eq!(b.authority().as_str(), "10.0.0.5:9000");

        let c = table.proxy_for("c.example").unwrap();
        assert_eq!(c.scheme(), &Scheme::HTTPS);
        assert_eq!(c.authority().as_str(), "backend.lan");
        assert!(c.certificate().is_none());
    }

    #[test]
    fn invalid_target_aborts_the_build() {
        let err = RoutingTable::build(
            pairs(&[("a.example", "https://up")]),
            &[
                entry("b.example", "http://10.0.0.5:9000", None),
                entry("c.example", "not a url", None),
            ],
            None,
        )
        .unwrap_err();

        assert!(matches!(err, BuildError::InvalidTargetUrl { ref host, .. } if host == "c.example"));
    }

    #[test]
    fn target_without_http_scheme_is_invalid() {
        for target in ["ftp://files.lan", "mailto:ops@lan"] {
            let err = ProxyTarget::parse("b.example", target).unwrap_err();
            assert!(matches!(err, BuildError::InvalidTargetUrl { .. }), "{target}");
        }
    }

    #[test]
    fn no_proxy_entries_is_an_empty_map() {
        let table = RoutingTable::build(Vec::new(), &[], None).unwrap();
        assert_eq!(table.proxy_count(), 0);
        assert!(table.certificate_for(Some("b.example")).is_none());
    }

    #[test]
    fn entry_certificate_wins_over_default() {
        let dir = TempDir::new().unwrap();
        let default = write_pair(&dir, "default.lan");
        let b = write_pair(&dir, "b.example");

        let table = RoutingTable::build(
            Vec::new(),
            &[
                entry("b.example", "http://10.0.0.5:9000", Some(&b)),
                entry("c.example", "http://10.0.0.6:9000", None),
            ],
            Some(&default),
        )
        .unwrap();
        assert!(table.has_default_certificate());

        let entry_cert = table.proxy_for("b.example").unwrap().certificate().unwrap();
        let served = table.certificate_for(Some("b.example")).unwrap();
        assert!(Arc::ptr_eq(entry_cert, &served));

        let fallback = table.certificate_for(Some("c.example")).unwrap();
        assert!(!Arc::ptr_eq(entry_cert, &fallback));
        let unknown = table.certificate_for(Some("unknown.lan")).unwrap();
        assert!(Arc::ptr_eq(&fallback, &unknown));
        let no_sni = table.certificate_for(None).unwrap();
        assert!(Arc::ptr_eq(&fallback, &no_sni));
    }

    #[test]
    fn unreadable_entry_certificate_aborts_the_build() {
        let dir = TempDir::new().unwrap();
        let missing = CertificatePaths {
            cert: dir.path().join("missing.pem"),
            key: dir.path().join("missing.key"),
        };

        let err = RoutingTable::build(
            Vec::new(),
            &[entry("b.example", "http://10.0.0.5:9000", Some(&missing))],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::Certificate { ref context, .. } if context == "b.example"));
    }

    #[test]
    fn unreadable_default_certificate_aborts_the_build() {
        let dir = TempDir::new().unwrap();
        let missing = CertificatePaths {
            cert: dir.path().join("missing.pem"),
            key: dir.path().join("missing.key"),
        };

        let err = RoutingTable::build(Vec::new(), &[], Some(&missing)).unwrap_err();
        assert!(matches!(err, BuildError::Certificate { .. }));
    }
}
