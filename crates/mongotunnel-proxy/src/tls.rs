//! TLS towards the upstream server
//!
//! Lets a plaintext driver talk to a TLS-only server: the proxy terminates
//! the client side in the clear and wraps the upstream side with rustls.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::{Certificate, ClientConfig, RootCertStore, ServerName};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use mongotunnel_common::config::TlsConfig;
use mongotunnel_common::error::{NetworkError, Result};

/// Connector for the upstream side of every proxied connection
#[derive(Clone)]
pub struct UpstreamTls {
    connector: TlsConnector,
    server_name: ServerName,
}

impl UpstreamTls {
    pub fn from_config(config: &TlsConfig) -> Result<Self> {
        let roots = load_roots(Path::new(&config.ca_file))?;

        let client_config = ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth();

        let server_name = ServerName::try_from(config.server_name.as_str()).map_err(|e| {
            NetworkError::TlsError(format!("Invalid server name {:?}: {}", config.server_name, e))
        })?;

        Ok(Self {
            connector: TlsConnector::from(Arc::new(client_config)),
            server_name,
        })
    }

    pub async fn connect(&self, stream: TcpStream) -> Result<TlsStream<TcpStream>> {
        let stream = self
            .connector
            .connect(self.server_name.clone(), stream)
            .await
            .map_err(|e| NetworkError::TlsError(format!("Handshake failed: {}", e)))?;
        debug!("TLS session established with upstream");
        Ok(stream)
    }
}

/// Load trusted roots from a PEM bundle
fn load_roots(path: &Path) -> Result<RootCertStore> {
    let file = File::open(path).map_err(|e| {
        NetworkError::TlsError(format!("Failed to open CA file {}: {}", path.display(), e))
    })?;
    let mut reader = BufReader::new(file);

    let certs = rustls_pemfile::certs(&mut reader).map_err(|e| {
        NetworkError::TlsError(format!("Failed to read CA file {}: {}", path.display(), e))
    })?;

    if certs.is_empty() {
        return Err(NetworkError::TlsError(format!(
            "No certificates found in {}",
            path.display()
        ))
        .into());
    }

    let mut roots = RootCertStore::empty();
    for der in certs {
        roots
            .add(&Certificate(der))
            .map_err(|e| NetworkError::TlsError(format!("Rejected CA certificate: {:?}", e)))?;
    }
    Ok(roots)
}
