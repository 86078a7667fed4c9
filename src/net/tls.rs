//! TLS configuration and certificate loading.
//!
//! Certificates are loaded into [`CertifiedKey`]s once per routing table
//! build. The handshake never touches the filesystem: [`CertResolver`] picks
//! an already loaded key from the current routing snapshot.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls::ServerConfig;
use thiserror::Error;

use crate::config::CertificatePaths;
use crate::routing::RouteStore;

/// Failure to turn a PEM certificate/key pair into a usable [`CertifiedKey`].
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no certificates found in {0:?}")]
    NoCertificates(PathBuf),

    #[error("no private key found in {0:?}")]
    NoPrivateKey(PathBuf),

    #[error("unsupported private key in {path:?}: {source}")]
    UnsupportedKey {
        path: PathBuf,
        source: rustls::Error,
    },

    #[error("certificate {cert:?} does not match private key {key:?}")]
    KeyMismatch { cert: PathBuf, key: PathBuf },
}

/// Load a PEM certificate chain and private key.
pub fn load_certified_key(paths: &CertificatePaths) -> Result<Arc<CertifiedKey>, CertificateError> {
    let chain = read_chain(&paths.cert)?;
    let key = read_private_key(&paths.key)?;

    let signing_key = rustls::crypto::aws_lc_rs::sign::any_supported_type(&key).map_err(|source| {
        CertificateError::UnsupportedKey {
            path: paths.key.clone(),
            source,
        }
    })?;

    let certified = CertifiedKey::new(chain, signing_key);
    match certified.keys_match() {
        // Some key types cannot report their public half; accept those.
        Ok(()) | Err(rustls::Error::InconsistentKeys(rustls::InconsistentKeys::Unknown)) => {}
        Err(_) => {
            return Err(CertificateError::KeyMismatch {
                cert: paths.cert.clone(),
                key: paths.key.clone(),
            })
        }
    }

    tracing::debug!(cert = %paths.cert.display(), "Certificate loaded");
    Ok(Arc::new(certified))
}

fn open(path: &Path) -> Result<BufReader<File>, CertificateError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| CertificateError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn read_chain(path: &Path) -> Result<Vec<CertificateDer<'static>>, CertificateError> {
    let mut reader = open(path)?;
    let chain = rustls_pemfile::certs(&mut reader)
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|source| CertificateError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    if chain.is_empty() {
        return Err(CertificateError::NoCertificates(path.to_path_buf()));
    }
    Ok(chain)
}

fn read_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, CertificateError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| CertificateError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| CertificateError::NoPrivateKey(path.to_path_buf()))
}

/// Picks the certificate for a handshake from the current routing table.
///
/// Entry certificate for the requested server name first, then the default
/// certificate. Returning `None` makes rustls abort the handshake.
#[derive(Debug)]
pub struct CertResolver {
    routes: Arc<RouteStore>,
}

impl CertResolver {
    pub fn new(routes: Arc<RouteStore>) -> Self {
        Self { routes }
    }

    /// Resolution by name, shared by the rustls callback and tests.
    pub fn certificate_for(&self, server_name: Option<&str>) -> Option<Arc<CertifiedKey>> {
        let certificate = self.routes.load().certificate_for(server_name);
        if certificate.is_none() {
            tracing::warn!(
                server_name = server_name.unwrap_or("<none>"),
                "No certificate available, aborting handshake"
            );
        }
        certificate
    }
}

impl ResolvesServerCert for CertResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        self.certificate_for(client_hello.server_name())
    }
}

/// Build the listener's TLS configuration around a resolver.
pub fn server_config(resolver: Arc<CertResolver>) -> Result<RustlsConfig, rustls::Error> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_cert_resolver(resolver);
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(RustlsConfig::from_config(Arc::new(config)))
}
