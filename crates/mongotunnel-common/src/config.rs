//! Configuration management for mongotunnel

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Main configuration structure for mongotunnel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Proxy configuration
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Smoke-test client configuration
    #[serde(default)]
    pub tester: TesterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML/JSON file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse(path.as_ref(), &content)
    }

    /// Load configuration from file, falling back to defaults when it does not exist
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match tokio::fs::metadata(path.as_ref()).await {
            Ok(_) => Self::load(path).await,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.as_ref().display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(Error::Config(format!(
                "Failed to access config file {}: {}",
                path.as_ref().display(),
                e
            ))),
        }
    }

    fn parse(path: &Path, content: &str) -> Result<Self> {
        let config: Config = if path.extension().map_or(false, |ext| ext == "toml") {
            toml::from_str(content)?
        } else {
            serde_json::from_str(content)?
        };

        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Address the proxy accepts driver connections on
    pub listen: String,
    /// MongoDB server the proxy forwards to
    pub upstream: String,
    /// Disable Nagle's algorithm on both ends
    pub nodelay: bool,
    /// Trace raw frames as hex instead of lossy text
    pub hex: bool,
    /// Collection that insert commands are mirrored into
    pub mirror_collection: Option<String>,
    /// Answer driver handshakes locally instead of forwarding them
    pub answer_handshake: bool,
    /// Connect to the upstream over TLS
    pub tls: Option<TlsConfig>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:27018".to_string(),
            upstream: "127.0.0.1:27017".to_string(),
            nodelay: true,
            hex: false,
            mirror_collection: None,
            answer_handshake: false,
            tls: None,
        }
    }
}

/// Upstream TLS settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Name presented for SNI and certificate verification
    pub server_name: String,
    /// PEM bundle of trusted root certificates
    pub ca_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesterConfig {
    /// host:port of the MongoDB endpoint (usually the proxy)
    pub address: String,
    /// Logical database name
    pub database: String,
    /// Collection the smoke test writes to
    pub collection: String,
    /// Maximum number of records returned by the query step
    pub query_limit: i64,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:27018".to_string(),
            database: "test".to_string(),
            collection: "people".to_string(),
            query_limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base filter directive (info, debug, trace, ...)
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Colourise terminal output
    pub color: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            color: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
