//! Configuration schema definitions.
//!
//! This module defines the configuration document read by the redirector.
//! All types derive Serde traits for deserialization from TOML files.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the redirector.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RedirectorConfig {
    /// Listener configuration (bind address, ports, drain deadline).
    ///
    /// Only read at startup; changes are ignored on reload.
    pub listener: ListenerConfig,

    /// Timeout configuration for outbound connections.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Hostname → absolute URL the client is redirected to.
    pub redirects: HashMap<String, String>,

    /// HTTPS termination and forwarding.
    pub https_proxy: HttpsProxyConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address both listeners bind to.
    pub bind_ip: IpAddr,

    /// Plain HTTP (redirect) port.
    pub http_port: u16,

    /// HTTPS (proxy) port.
    pub https_port: u16,

    /// Deadline for draining in-flight requests on stop, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: 80,
            https_port: 443,
            shutdown_timeout_secs: 10,
        }
    }
}

/// Timeout configuration for outbound operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout in seconds.
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { connect_secs: 5 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// The `[https_proxy]` section.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HttpsProxyConfig {
    /// Certificate presented when no entry matches the requested server name.
    pub default_cert: Option<PathBuf>,

    /// Private key for `default_cert`.
    pub default_key: Option<PathBuf>,

    /// Proxy entries, in file order.
    #[serde(rename = "entry")]
    pub entries: Vec<ProxyEntryConfig>,
}

impl HttpsProxyConfig {
    /// The default certificate/key pair, if both halves are configured.
    pub fn default_pair(&self) -> Option<CertificatePaths> {
        CertificatePaths::pair(self.default_cert.as_ref(), self.default_key.as_ref())
    }
}

/// A single `[[https_proxy.entry]]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyEntryConfig {
    /// Hostname the client asks for (SNI and `Host`).
    pub incoming: String,

    /// Backend URL, e.g. `http://10.0.0.5:9000`.
    pub target: String,

    /// Optional certificate chain (PEM) for this hostname.
    #[serde(default)]
    pub cert: Option<PathBuf>,

    /// Private key (PEM) for `cert`.
    #[serde(default)]
    pub key: Option<PathBuf>,
}

impl ProxyEntryConfig {
    /// The entry's certificate/key pair, if both halves are configured.
    pub fn certificate_pair(&self) -> Option<CertificatePaths> {
        CertificatePaths::pair(self.cert.as_ref(), self.key.as_ref())
    }
}

/// Paths of a PEM certificate chain and its private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl CertificatePaths {
    fn pair(cert: Option<&PathBuf>, key: Option<&PathBuf>) -> Option<Self> {
        match (cert, key) {
            (Some(cert), Some(key)) if !cert.as_os_str().is_empty() && !key.as_os_str().is_empty() => {
                Some(Self {
                    cert: cert.clone(),
                    key: key.clone(),
                })
            }
            _ => None,
        }
    }
}
