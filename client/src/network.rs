//! Client side of the TCP line protocol: handshake, event decoding and
//! update sending

use log::{debug, info};
use shared::{DiamondId, Envelope, MessageType, Point, ProtocolError, ServerEvent, Update};
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;

pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection and handshake failures
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("no join confirmation within {0:?}")]
    HandshakeTimeout(Duration),
    #[error("expected a join confirmation, got {0:?}")]
    UnexpectedHandshake(MessageType),
    #[error("server closed the connection")]
    Disconnected,
}

/// Connection tunables
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound for connecting and receiving the join confirmation
    pub handshake_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

/// A joined player's connection to the server
pub struct Client {
    id: u32,
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Connects, sends `name` and waits for the assigned player id.
    ///
    /// The match snapshot that follows the confirmation is left for
    /// [`Client::next_event`].
    pub async fn connect<A: ToSocketAddrs>(
        addr: A,
        name: &str,
        config: &ClientConfig,
    ) -> Result<Self, ClientError> {
        timeout(config.handshake_timeout, Self::handshake(addr, name))
            .await
            .map_err(|_| ClientError::HandshakeTimeout(config.handshake_timeout))?
    }

    /// Connects, sends the name and waits for the assigned id
    async fn handshake<A: ToSocketAddrs>(addr: A, name: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, mut writer) = stream.into_split();

        let mut first_line = name.replace('\n', " ");
        first_line.push('\n');
        writer.write_all(first_line.as_bytes()).await?;

        let mut lines = BufReader::new(read_half).lines();
        let id = match read_event(&mut lines).await? {
            ServerEvent::JoinAccepted(accepted) => accepted.id,
            other => return Err(ClientError::UnexpectedHandshake(other.kind())),
        };
        info!("Joined as player {}", id);

        Ok(Self { id, lines, writer })
    }

    /// Id assigned by the server
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Waits for the next message from the server
    pub async fn next_event(&mut self) -> Result<ServerEvent, ClientError> {
        read_event(&mut self.lines).await
    }

    /// Reports a new position, optionally claiming a diamond
    pub async fn send_update(
        &mut self,
        position: Point,
        claim: Option<DiamondId>,
    ) -> Result<(), ClientError> {
        let update = match claim {
            Some(diamond) => Update::claiming(position, diamond),
            None => Update::moved(position),
        };
        let line = Envelope::new(MessageType::Update, &update)?.to_line()?;
        self.writer.write_all(line.as_bytes()).await?;
        Ok(())
    }

    /// Closes the write side so the server sees a clean disconnect
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Reads and decodes the next server line. End of stream is
/// [`ClientError::Disconnected`].
async fn read_event(
    lines: &mut Lines<BufReader<OwnedReadHalf>>,
) -> Result<ServerEvent, ClientError> {
    loop {
        let Some(line) = lines.next_line().await? else {
            return Err(ClientError::Disconnected);
        };
        if line.trim().is_empty() {
            continue;
        }
        let envelope = Envelope::from_line(&line)?;
        debug!("Received {:?} message", envelope.kind);
        return Ok(ServerEvent::try_from(&envelope)?);
    }
}
