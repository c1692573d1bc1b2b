//! TCP ingestion listener
//!
//! One task per connection. Each non-empty line is stamped with the local
//! receive time, appended to the event log and acknowledged with `OK`.
//! Connections are independent: a failing peer only tears down its own task.
//! There is no backpressure or rate limiting on producers.

use super::framing::{FrameError, LineFramer, DEFAULT_MAX_LINE_BYTES};
use crate::aggregator::format_log_line;
use crate::store::{EventStore, StoreError};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::time::{sleep, Duration};

pub const ACK: &[u8] = b"OK";

const READ_CHUNK_BYTES: usize = 1024;

#[derive(Debug)]
pub enum IngestError {
    Io(std::io::Error),
    Store(StoreError),
    Frame(FrameError),
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::Io(err)
    }
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        IngestError::Store(err)
    }
}

impl From<FrameError> for IngestError {
    fn from(err: FrameError) -> Self {
        IngestError::Frame(err)
    }
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Io(e) => write!(f, "Transport error: {}", e),
            IngestError::Store(e) => write!(f, "Store error: {}", e),
            IngestError::Frame(e) => write!(f, "Framing error: {}", e),
        }
    }
}

impl std::error::Error for IngestError {}

pub struct IngestionListener {
    listener: TcpListener,
    store: Arc<EventStore>,
    max_line_bytes: usize,
}

impl IngestionListener {
    /// Bind the ingestion socket. Failing here is fatal for the runtime.
    pub async fn bind<A: ToSocketAddrs>(addr: A, store: Arc<EventStore>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            store,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        })
    }

    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the task is dropped.
    pub async fn run(self) {
        match self.listener.local_addr() {
            Ok(addr) => log::info!("📡 Ingestion listener accepting on {}", addr),
            Err(_) => log::info!("📡 Ingestion listener accepting"),
        }

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    // Usually fd exhaustion; give the process a moment before retrying.
                    log::error!("❌ Accept failed: {}", e);
                    sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };

            let store = self.store.clone();
            let max_line_bytes = self.max_line_bytes;
            tokio::spawn(async move {
                log::info!("🔌 Connection from {}", peer);
                match handle_connection(stream, store, max_line_bytes).await {
                    Ok(count) => log::info!("👋 Client {} disconnected ({} messages)", peer, count),
                    Err(e) => log::warn!("⚠️  Client {} dropped: {}", peer, e),
                }
            });
        }
    }
}

/// Serve one producer until it closes. Returns the number of stored messages.
///
/// An append failure withholds the acknowledgement and ends the connection.
pub async fn handle_connection<S>(
    mut stream: S,
    store: Arc<EventStore>,
    max_line_bytes: usize,
) -> Result<u64, IngestError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framer = LineFramer::new(max_line_bytes);
    let mut chunk = [0u8; READ_CHUNK_BYTES];
    let mut stored = 0u64;

    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => break,
            Err(e) => return Err(e.into()),
        };

        for message in framer.push(&chunk[..n])? {
            store_message(&store, &message)?;
            stream.write_all(ACK).await?;
            stored += 1;
        }
    }

    if let Some(message) = framer.finish() {
        store_message(&store, &message)?;
        // Peer may already be gone; the message is stored either way.
        let _ = stream.write_all(ACK).await;
        stored += 1;
    }

    let _ = stream.shutdown().await;
    Ok(stored)
}

fn store_message(store: &EventStore, message: &str) -> Result<(), StoreError> {
    let received_at = chrono::Local::now().naive_local();
    log::debug!("📥 Received: {}", message);
    store.append(&format_log_line(&received_at, message))
}
