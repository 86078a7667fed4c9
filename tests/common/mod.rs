//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use http_redirector::{FileSource, Redirector, StartOptions};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a backend that answers every request with its request line and
/// `Host` header, e.g. `GET /a?b=1 HTTP/1.1|host=a.lan`.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut head = Vec::new();
                        let mut buf = [0u8; 1024];
                        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => head.extend_from_slice(&buf[..n]),
                            }
                        }

                        let head = String::from_utf8_lossy(&head);
                        let mut lines = head.lines();
                        let request_line = lines.next().unwrap_or_default().to_string();
                        let host = lines
                            .filter_map(|line| line.split_once(':'))
                            .find(|(name, _)| name.eq_ignore_ascii_case("host"))
                            .map(|(_, value)| value.trim().to_string())
                            .unwrap_or_default();

                        let body = format!("{request_line}|host={host}");
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A self-signed certificate written to disk.
pub struct TestCert {
    pub cert: PathBuf,
    pub key: PathBuf,
    pub der: Vec<u8>,
}

/// Generate a self-signed certificate for `host` inside `dir`.
pub fn write_cert(dir: &TempDir, host: &str) -> TestCert {
    let generated = rcgen::generate_simple_self_signed(vec![host.to_string()]).unwrap();
    let cert = dir.path().join(format!("{host}.crt"));
    let key = dir.path().join(format!("{host}.key"));
    std::fs::write(&cert, generated.cert.pem()).unwrap();
    std::fs::write(&key, generated.key_pair.serialize_pem()).unwrap();

    TestCert {
        cert,
        key,
        der: generated.cert.der().to_vec(),
    }
}

/// Write a configuration document, binding both listeners to loopback.
pub fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("http-redirector.toml");
    rewrite_config(&path, body);
    path
}

/// Replace the configuration document in place.
pub fn rewrite_config(path: &Path, body: &str) {
    let document = format!("[listener]\nbind_ip = \"127.0.0.1\"\n\n{body}");
    std::fs::write(path, document).unwrap();
}

/// `[[https_proxy.entry]]` block for `incoming`.
pub fn proxy_entry(incoming: &str, target: &str, cert: Option<&TestCert>) -> String {
    let mut entry = format!(
        "[[https_proxy.entry]]\nincoming = \"{incoming}\"\ntarget = \"{target}\"\n"
    );
    if let Some(cert) = cert {
        entry.push_str(&format!(
            "cert = \"{}\"\nkey = \"{}\"\n",
            cert.cert.display(),
            cert.key.display()
        ));
    }
    entry
}

/// Start a redirector on ephemeral ports.
pub async fn start_redirector(config: &Path) -> Redirector {
    Redirector::start(Arc::new(FileSource::new(config)), ephemeral())
        .await
        .unwrap()
}

pub fn ephemeral() -> StartOptions {
    StartOptions {
        http_port: Some(0),
        https_port: Some(0),
        shutdown_timeout: Some(Duration::from_secs(1)),
    }
}

/// Plain HTTP client that does not follow redirects and sends `host` to `addr`.
pub fn http_client(host: &str, addr: SocketAddr) -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .resolve(host, addr)
        .build()
        .unwrap()
}

/// HTTPS client that sends `host` as SNI to `addr` and exposes the peer
/// certificate.
pub fn https_client(host: &str, addr: SocketAddr) -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .danger_accept_invalid_certs(true)
        .tls_info(true)
        .resolve(host, addr)
        .build()
        .unwrap()
}

/// DER of the certificate the server presented.
pub fn peer_certificate(response: &reqwest::Response) -> Vec<u8> {
    response
        .extensions()
        .get::<reqwest::tls::TlsInfo>()
        .and_then(|info| info.peer_certificate())
        .unwrap()
        .to_vec()
}
