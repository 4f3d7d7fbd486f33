//! One proxied client connection: upstream dial, two framed pipes, byte counters

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use mongotunnel_common::config::ProxyConfig;
use mongotunnel_common::error::{NetworkError, Result};
use mongotunnel_protocol::frame_length;

use crate::inspect::{Direction, Inspector, PendingMirrors, Verdict};
use crate::tls::UpstreamTls;

const READ_CHUNK: usize = 64 * 1024;

/// Settings every connection task shares
pub struct ProxySettings {
    pub upstream: String,
    pub nodelay: bool,
    pub hex: bool,
    pub mirror_collection: Option<String>,
    pub answer_handshake: bool,
    pub tls: Option<UpstreamTls>,
}

impl ProxySettings {
    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        let tls = config.tls.as_ref().map(UpstreamTls::from_config).transpose()?;

        Ok(Self {
            upstream: config.upstream.clone(),
            nodelay: config.nodelay,
            hex: config.hex,
            mirror_collection: config.mirror_collection.clone(),
            answer_handshake: config.answer_handshake,
            tls,
        })
    }
}

/// Byte totals of a finished connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionSummary {
    /// client -> server, mirrored inserts included
    pub bytes_sent: u64,
    /// server -> client, local answers included
    pub bytes_received: u64,
}

#[derive(Default)]
struct Counters {
    sent: AtomicU64,
    received: AtomicU64,
}

trait UpstreamStream: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> UpstreamStream for T {}

type SharedWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// Manages a proxied connection, piping data between client and upstream
pub struct Proxy {
    settings: Arc<ProxySettings>,
    client: TcpStream,
    client_addr: SocketAddr,
}

impl Proxy {
    /// Takes over the accepted client connection and closes it when finished.
    pub fn new(settings: Arc<ProxySettings>, client: TcpStream, client_addr: SocketAddr) -> Self {
        Self {
            settings,
            client,
            client_addr,
        }
    }

    /// Dial the upstream and proxy until either side closes
    pub async fn start(self) -> Result<ConnectionSummary> {
        let settings = self.settings;

        let upstream = TcpStream::connect(&settings.upstream).await.map_err(|e| {
            NetworkError::ConnectionFailed {
                addr: settings.upstream.clone(),
                reason: e.to_string(),
            }
        })?;

        if settings.nodelay {
            if let Err(e) = self.client.set_nodelay(true).and(upstream.set_nodelay(true)) {
                warn!("Failed to disable Nagle's algorithm: {}", e);
            }
        }

        let upstream_addr = upstream
            .peer_addr()
            .map_or_else(|_| settings.upstream.clone(), |addr| addr.to_string());

        let upstream: Box<dyn UpstreamStream> = match &settings.tls {
            Some(tls) => Box::new(tls.connect(upstream).await?),
            None => Box::new(upstream),
        };

        info!("Opened {} >>> {}", self.client_addr, upstream_addr);

        let (client_read, client_write) = self.client.into_split();
        let (upstream_read, upstream_write) = tokio::io::split(upstream);

        let client_writer: SharedWriter = Arc::new(Mutex::new(Box::new(client_write)));
        let upstream_writer: SharedWriter = Arc::new(Mutex::new(Box::new(upstream_write)));

        let counters = Arc::new(Counters::default());
        let pending = PendingMirrors::default();

        let outbound = Pipe {
            inspector: Inspector::new(Direction::ClientToServer, &settings, pending.clone()),
            dst: upstream_writer,
            back: Some(client_writer.clone()),
            counters: counters.clone(),
        };
        let inbound = Pipe {
            inspector: Inspector::new(Direction::ServerToClient, &settings, pending),
            dst: client_writer,
            back: None,
            counters: counters.clone(),
        };

        let result = tokio::select! {
            result = outbound.run(client_read) => result,
            result = inbound.run(upstream_read) => result,
        };

        if let Err(e) = result {
            match e.kind() {
                io::ErrorKind::UnexpectedEof
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::BrokenPipe => debug!("Connection ended: {}", e),
                _ => warn!("Proxy pipe failed: {}", e),
            }
        }

        let summary = ConnectionSummary {
            bytes_sent: counters.sent.load(Ordering::Relaxed),
            bytes_received: counters.received.load(Ordering::Relaxed),
        };
        info!(
            "Closed ({} bytes sent, {} bytes received)",
            summary.bytes_sent, summary.bytes_received
        );

        Ok(summary)
    }
}

/// One direction of a connection
struct Pipe {
    inspector: Inspector,
    dst: SharedWriter,
    /// Writer back towards the source, for locally answered requests
    back: Option<SharedWriter>,
    counters: Arc<Counters>,
}

impl Pipe {
    async fn run<R: AsyncRead + Unpin>(self, mut src: R) -> io::Result<()> {
        let direction = self.inspector.direction();
        let mut buffer = BytesMut::with_capacity(READ_CHUNK);
        let mut passthrough = false;

        loop {
            buffer.reserve(READ_CHUNK);
            let n = src.read_buf(&mut buffer).await?;
            if n == 0 {
                return Ok(());
            }
            debug!("{} {} bytes read", direction, n);

            if passthrough {
                let chunk = buffer.split().freeze();
                self.forward(&self.dst, &chunk, direction).await?;
                continue;
            }

            loop {
                match frame_length(&buffer) {
                    Ok(Some(len)) => {
                        let frame = buffer.split_to(len).freeze();
                        self.dispatch(frame).await?;
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(
                            "{} {}; passing the rest of the stream through unframed",
                            direction, e
                        );
                        passthrough = true;
                        let chunk = buffer.split().freeze();
                        self.forward(&self.dst, &chunk, direction).await?;
                        break;
                    }
                }
            }
        }
    }

    async fn dispatch(&self, frame: Bytes) -> io::Result<()> {
        let direction = self.inspector.direction();

        match self.inspector.inspect(&frame) {
            Verdict::Forward => self.forward(&self.dst, &frame, direction).await,
            Verdict::ForwardWithMirror(mirror) => {
                self.forward(&self.dst, &frame, direction).await?;
                self.forward(&self.dst, &mirror, direction).await
            }
            Verdict::Answer(reply) => match &self.back {
                Some(back) => self.forward(back, &reply, Direction::ServerToClient).await,
                None => self.forward(&self.dst, &frame, direction).await,
            },
            Verdict::Swallow => Ok(()),
        }
    }

    async fn forward(&self, writer: &SharedWriter, bytes: &[u8], towards: Direction) -> io::Result<()> {
        {
            let mut writer = writer.lock().await;
            writer.write_all(bytes).await?;
            writer.flush().await?;
        }

        let counter = match towards {
            Direction::ClientToServer => &self.counters.sent,
            Direction::ServerToClient => &self.counters.received,
        };
        counter.fetch_add(bytes.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}
