//! Configuration loading.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::RedirectorConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "IO error reading {}: {}", path.display(), e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(_, e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Somewhere a configuration document can be (re)read from.
///
/// Every call must return a freshly parsed and validated document; the
/// reload coordinator calls it from a blocking thread.
pub trait ConfigSource: Send + Sync + 'static {
    /// Read, parse and validate the configuration.
    fn load(&self) -> Result<RedirectorConfig, ConfigError>;

    /// Human readable location for logs.
    fn describe(&self) -> String;
}

/// A TOML file on disk, re-read on every load.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<RedirectorConfig, ConfigError> {
        load_config(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RedirectorConfig, ConfigError> {
    tracing::info!(path = %path.display(), "Reading configuration");
    let content =
        fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
    parse_config(&content)
}

/// Parse and validate a TOML document.
pub fn parse_config(content: &str) -> Result<RedirectorConfig, ConfigError> {
    let config: RedirectorConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[listener]
http_port = 8080
https_port = 8443

[redirects]
"a.example" = "https://upstream-a"
"c.example" = "http://elsewhere.lan/path"

[https_proxy]
default_cert = "default.pem"
default_key = "default.key"

[[https_proxy.entry]]
incoming = "b.example"
target = "http://10.0.0.5:9000"

[[https_proxy.entry]]
incoming = "d.example"
target = "https://10.0.0.6"
cert = "d.pem"
key = "d.key"
"#;

    #[test]
    fn parses_full_document() {
        let config = parse_config(SAMPLE).unwrap();

        assert_eq!(config.listener.http_port, 8080);
        assert_eq!(config.listener.https_port, 8443);
        assert_eq!(config.listener.shutdown_timeout_secs, 10);
        assert_eq!(config.redirects.len(), 2);
        assert_eq!(config.redirects["a.example"], "https://upstream-a");

        let proxy = &config.https_proxy;
        assert!(proxy.default_pair().is_some());
        assert_eq!(proxy.entries.len(), 2);
        assert_eq!(proxy.entries[0].incoming, "b.example");
        assert!(proxy.entries[0].certificate_pair().is_none());
        assert_eq!(
            proxy.entries[1].certificate_pair().unwrap().cert,
            PathBuf::from("d.pem")
        );
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = parse_config("").unwrap();
        assert!(config.redirects.is_empty());
        assert!(config.https_proxy.entries.is_empty());
        assert_eq!(config.listener.http_port, 80);
        assert_eq!(config.listener.https_port, 443);
    }

    #[test]
    fn syntax_error_is_a_parse_error() {
        let err = parse_config("[redirects\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn semantic_error_is_a_validation_error() {
        let err = parse_config(
            r#"
[[https_proxy.entry]]
incoming = "b.example"
target = "http://10.0.0.5:9000"

[[https_proxy.entry]]
incoming = "b.example"
target = "http://10.0.0.7:9000"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));
        assert!(err.to_string().contains("b.example"));
    }

    #[test]
    fn case_variant_redirect_keys_fail_every_load() {
        let document = "[redirects]\n\"A.lan\" = \"https://first\"\n\"a.lan\" = \"https://second\"\n";

        for _ in 0..200 {
            let errors = match parse_config(document) {
                Err(ConfigError::Validation(errors)) => errors,
                other => panic!("expected a validation error, got {other:?}"),
            };
            assert_eq!(
                errors,
                vec![ValidationError::DuplicateRedirectHost {
                    host: "a.lan".into()
                }]
            );
        }
    }

    #[test]
    fn file_source_rereads_on_every_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[redirects]\n\"a.example\" = \"https://one\"").unwrap();
        let source = FileSource::new(file.path());
        assert_eq!(source.load().unwrap().redirects["a.example"], "https://one");

        std::fs::write(file.path(), "[redirects]\n\"a.example\" = \"https://two\"\n").unwrap();
        assert_eq!(source.load().unwrap().redirects["a.example"], "https://two");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let source = FileSource::new("/nonexistent/http-redirector.toml");
        assert!(matches!(source.load(), Err(ConfigError::Io(..))));
    }
}
