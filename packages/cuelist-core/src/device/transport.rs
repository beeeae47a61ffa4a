//! Wire transport for playout devices.
//!
//! Commands are line-oriented: one request line out, one reply line back,
//! `\r\n` terminated. The [`DeviceTransport`] trait is the seam that lets the
//! session logic run against a mock in tests; [`TcpTransport`] is the real
//! implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::state::DeviceConfig;

/// A command addressed at a device channel/layer.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// Start playing a media clip.
    PlayMedia {
        channel: u16,
        layer: u16,
        media: String,
        loop_media: bool,
        /// `(kind, duration_frames)` transition, if any.
        transition: Option<(String, u32)>,
    },
    /// Stop whatever is playing on the layer.
    StopMedia { channel: u16, layer: u16 },
    /// Add a graphic template to the layer.
    AddTemplate {
        channel: u16,
        layer: u16,
        template: String,
        /// JSON-encoded key/value payload.
        data: String,
        auto_play: bool,
    },
    /// Push new data into the template on the layer.
    UpdateTemplate {
        channel: u16,
        layer: u16,
        data: String,
    },
    /// Stop and remove the template on the layer.
    StopTemplate { channel: u16, layer: u16 },
}

impl DeviceCommand {
    /// Short command name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlayMedia { .. } => "PLAY",
            Self::StopMedia { .. } => "STOP",
            Self::AddTemplate { .. } => "CG ADD",
            Self::UpdateTemplate { .. } => "CG UPDATE",
            Self::StopTemplate { .. } => "CG STOP",
        }
    }

    /// Renders the command as a single request line (without the terminator).
    #[must_use]
    pub fn to_line(&self) -> String {
        match self {
            Self::PlayMedia {
                channel,
                layer,
                media,
                loop_media,
                transition,
            } => {
                let mut line = format!("PLAY {channel}-{layer} \"{media}\"");
                if *loop_media {
                    line.push_str(" LOOP");
                }
                if let Some((kind, frames)) = transition {
                    line.push_str(&format!(" {kind} {frames}"));
                }
                line
            }
            Self::StopMedia { channel, layer } => format!("STOP {channel}-{layer}"),
            Self::AddTemplate {
                channel,
                layer,
                template,
                data,
                auto_play,
            } => {
                let play_flag = if *auto_play { 1 } else { 0 };
                format!(
                    "CG {channel}-{layer} ADD 1 \"{template}\" {play_flag} \"{}\"",
                    escape_payload(data)
                )
            }
            Self::UpdateTemplate {
                channel,
                layer,
                data,
            } => format!(
                "CG {channel}-{layer} UPDATE 1 \"{}\"",
                escape_payload(data)
            ),
            Self::StopTemplate { channel, layer } => format!("CG {channel}-{layer} STOP 1"),
        }
    }
}

/// Escapes embedded quotes so a JSON payload survives the quoted field.
fn escape_payload(data: &str) -> String {
    data.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Reply line from a device, split into numeric code and remaining text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceReply {
    /// Three-digit status code (2xx success, 4xx/5xx failure).
    pub code: u16,
    /// Remainder of the reply line.
    pub text: String,
}

impl DeviceReply {
    /// Parses a reply line. Lines without a leading code are treated as 500.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let (code_part, rest) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
        match code_part.parse::<u16>() {
            Ok(code) => Self {
                code,
                text: rest.to_string(),
            },
            Err(_) => Self {
                code: 500,
                text: trimmed.to_string(),
            },
        }
    }

    /// Whether the device rejected the command.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.code >= 400
    }
}

/// Errors from the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The TCP connection could not be established.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Reading or writing the established connection failed.
    #[error("io error: {0}")]
    Io(String),

    /// The exchange did not complete within the configured timeout.
    #[error("command timed out")]
    Timeout,

    /// `send` was called with no established connection.
    #[error("transport not connected")]
    NotConnected,
}

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport seam for a single device.
///
/// Implementations own the connection lifecycle; callers never see sockets.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Establishes the connection.
    async fn connect(&self) -> TransportResult<()>;

    /// Tears down the connection. Must be idempotent.
    async fn disconnect(&self) -> TransportResult<()>;

    /// Sends one command and waits for the reply line.
    async fn send(&self, command: &DeviceCommand) -> TransportResult<DeviceReply>;
}

/// Line-oriented TCP transport.
///
/// The stream lives behind an async mutex: a command holds it across the
/// write/read round-trip, which also serializes concurrent senders.
pub struct TcpTransport {
    host: String,
    port: u16,
    connect_timeout: Duration,
    command_timeout: Duration,
    stream: Mutex<Option<BufReader<TcpStream>>>,
}

impl TcpTransport {
    /// Creates a transport for the given endpoint. Does not connect.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout,
            command_timeout,
            stream: Mutex::new(None),
        }
    }
}

#[async_trait]
impl DeviceTransport for TcpTransport {
    async fn connect(&self) -> TransportResult<()> {
        let mut guard = self.stream.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        let address = format!("{}:{}", self.host, self.port);
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| TransportError::Connect(format!("{address}: timed out")))?
            .map_err(|e| TransportError::Connect(format!("{address}: {e}")))?;
        *guard = Some(BufReader::new(stream));
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        let mut guard = self.stream.lock().await;
        if let Some(mut stream) = guard.take() {
            let _ = stream.get_mut().shutdown().await;
        }
        Ok(())
    }

    async fn send(&self, command: &DeviceCommand) -> TransportResult<DeviceReply> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(TransportError::NotConnected)?;

        let line = format!("{}\r\n", command.to_line());
        let exchange = async {
            stream
                .get_mut()
                .write_all(line.as_bytes())
                .await
                .map_err(|e| TransportError::Io(e.to_string()))?;

            let mut reply = String::new();
            let read = stream
                .read_line(&mut reply)
                .await
                .map_err(|e| TransportError::Io(e.to_string()))?;
            if read == 0 {
                return Err(TransportError::Io("connection closed by peer".to_string()));
            }
            Ok(DeviceReply::parse(&reply))
        };

        match tokio::time::timeout(self.command_timeout, exchange).await {
            Ok(result) => {
                // A failed exchange leaves the stream in an unknown state.
                if result.is_err() {
                    *guard = None;
                }
                result
            }
            Err(_) => {
                *guard = None;
                Err(TransportError::Timeout)
            }
        }
    }
}

/// Creates transports for configured devices.
///
/// The registry goes through this factory so tests can inject mocks.
pub trait TransportFactory: Send + Sync {
    /// Builds a transport for one device.
    fn create(&self, config: &DeviceConfig) -> Arc<dyn DeviceTransport>;
}

/// Factory producing [`TcpTransport`]s from device configuration.
pub struct TcpTransportFactory {
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl TcpTransportFactory {
    #[must_use]
    pub fn new(connect_timeout: Duration, command_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            command_timeout,
        }
    }
}

impl TransportFactory for TcpTransportFactory {
    fn create(&self, config: &DeviceConfig) -> Arc<dyn DeviceTransport> {
        Arc::new(TcpTransport::new(
            config.host.clone(),
            config.port,
            self.connect_timeout,
            self.command_timeout,
        ))
    }
}
