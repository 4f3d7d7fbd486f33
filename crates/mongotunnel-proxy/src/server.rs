//! Listener accepting driver connections

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use mongotunnel_common::config::ProxyConfig;
use mongotunnel_common::error::{NetworkError, Result};

use crate::connection::{Proxy, ProxySettings};

/// MongoDB wire protocol proxy
pub struct ProxyServer {
    listen: String,
    settings: Arc<ProxySettings>,
}

impl ProxyServer {
    /// Create a new proxy; TLS material is loaded here so bad settings fail fast
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        Ok(Self {
            listen: config.listen.clone(),
            settings: Arc::new(ProxySettings::from_config(config)?),
        })
    }

    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(&self.listen).await.map_err(|e| {
            NetworkError::BindFailed {
                addr: self.listen.clone(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Bind the configured address and serve forever
    pub async fn run(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!("Proxying {} >>> {}", local_addr, self.settings.upstream);
        if let Some(collection) = &self.settings.mirror_collection {
            info!("Mirroring inserts into collection {}", collection);
        }
        if self.settings.answer_handshake {
            info!("Answering driver handshakes locally");
        }

        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    debug!("New connection from {}", peer_addr);
                    let settings = self.settings.clone();
                    tokio::spawn(handle_connection(settings, stream, peer_addr));
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

async fn handle_connection(
    settings: Arc<ProxySettings>,
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
) {
    if let Err(e) = Proxy::new(settings, stream, peer_addr).start().await {
        warn!("Remote connection failed for {}: {}", peer_addr, e);
    }
}
