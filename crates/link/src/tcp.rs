use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use gnd_types::Packet;

use crate::{Link, LinkError, LinkResult, DEFAULT_RECONNECT_DELAY};

/// Upper bound on a single frame. Anything larger is a framing failure, not
/// a packet.
const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct TcpLinkConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub auto_reconnect: bool,
    pub reconnect_delay: Duration,
    pub read_allowed: bool,
}

impl Default for TcpLinkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7779,
            connect_timeout: Duration::from_secs(5),
            auto_reconnect: true,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            read_allowed: true,
        }
    }
}

/// TCP client link carrying length-prefixed frames: a u32 big-endian length
/// followed by the packet buffer.
pub struct TcpLink {
    config: TcpLinkConfig,
    reader: Mutex<Option<OwnedReadHalf>>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    connected: AtomicBool,
    /// Cancelled by `disconnect` to release a read blocked on the socket.
    closing: std::sync::Mutex<CancellationToken>,
}

impl TcpLink {
    pub fn new(config: TcpLinkConfig) -> Self {
        Self {
            config,
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            connected: AtomicBool::new(false),
            closing: std::sync::Mutex::new(CancellationToken::new()),
        }
    }

    fn closing_token(&self) -> CancellationToken {
        self.closing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    async fn read_frame(reader: &mut OwnedReadHalf) -> LinkResult<Option<Vec<u8>>> {
        let mut header = [0u8; 4];
        match reader.read_exact(&mut header).await {
            Ok(_) => {}
            // EOF at a frame boundary is the peer closing cleanly.
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(err) => return Err(err.into()),
        }

        let len = u32::from_be_bytes(header) as usize;
        if len > MAX_FRAME_LEN {
            return Err(LinkError::Protocol(format!(
                "frame length {len} out of range"
            )));
        }

        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload).await?;

        Ok(Some(payload))
    }

    async fn write_frame(&self, buffer: &[u8]) -> LinkResult<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(LinkError::NotConnected)?;

        writer.write_all(&(buffer.len() as u32).to_be_bytes()).await?;
        writer.write_all(buffer).await?;
        writer.flush().await?;

        Ok(())
    }
}

#[async_trait]
impl Link for TcpLink {
    async fn connect(&self) -> LinkResult<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let stream = timeout(self.config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| LinkError::Timeout)??;
        let _ = stream.set_nodelay(true);

        let (read_half, write_half) = stream.into_split();
        *self.reader.lock().await = Some(read_half);
        *self.writer.lock().await = Some(write_half);
        *self
            .closing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = CancellationToken::new();
        self.connected.store(true, Ordering::SeqCst);

        debug!(%addr, "tcp link connected");

        Ok(())
    }

    async fn disconnect(&self) -> LinkResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        self.closing_token().cancel();

        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        // The read half is dropped here unless a read is pending; a pending
        // read observes the cancelled token and releases it.
        if let Ok(mut guard) = self.reader.try_lock() {
            guard.take();
        }

        Ok(())
    }

    async fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn read(&self) -> LinkResult<Option<Packet>> {
        let closing = self.closing_token();

        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or(LinkError::NotConnected)?;

        let frame = tokio::select! {
            _ = closing.cancelled() => return Err(LinkError::Canceled),
            frame = Self::read_frame(reader) => frame?,
        };

        match frame {
            Some(payload) => Ok(Some(Packet::from_buffer(payload))),
            None => {
                self.connected.store(false, Ordering::SeqCst);
                Ok(None)
            }
        }
    }

    async fn write(&self, command: &Packet) -> LinkResult<()> {
        self.write_frame(&command.buffer).await
    }

    async fn write_raw(&self, data: &[u8]) -> LinkResult<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(LinkError::NotConnected)?;

        writer.write_all(data).await?;
        writer.flush().await?;

        Ok(())
    }

    fn read_allowed(&self) -> bool {
        self.config.read_allowed
    }

    fn auto_reconnect(&self) -> bool {
        self.config.auto_reconnect
    }

    fn reconnect_delay(&self) -> Duration {
        self.config.reconnect_delay
    }
}
