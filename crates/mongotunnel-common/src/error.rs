//! Error types for mongotunnel
//!
//! One error hierarchy shared by the protocol codec, the proxy and the binary.

use thiserror::Error;

/// Result type alias using mongotunnel's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mongotunnel
#[derive(Error, Debug)]
pub enum Error {
    // Protocol Errors
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    // Network Errors
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    // Configuration Errors
    #[error("Configuration error: {0}")]
    Config(String),

    // IO Errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wire protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    #[error("Incomplete message: needed {needed} bytes, had {available}")]
    IncompleteMessage { needed: usize, available: usize },

    #[error("Message length {0} out of bounds")]
    LengthOutOfBounds(i64),

    #[error("Unterminated C string")]
    UnterminatedString,

    #[error("Invalid BSON document: {0}")]
    InvalidDocument(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Could not identify handshake query: {0}")]
    UnrecognizedHandshake(String),
}

/// Network-related errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection to {addr} failed: {reason}")]
    ConnectionFailed { addr: String, reason: String },

    #[error("Bind to {addr} failed: {reason}")]
    BindFailed { addr: String, reason: String },

    #[error("TLS error: {0}")]
    TlsError(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(format!("Failed to parse JSON config: {}", e))
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(format!("Failed to parse TOML config: {}", e))
    }
}
