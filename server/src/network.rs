//! Server network layer: TCP accept loop and per-connection tasks
//!
//! Every connection gets a reader task, which performs the name handshake
//! and forwards updates to the hub, and a writer task draining the
//! connection's outbound queue. Both end in an unregistration so a broken
//! connection never lingers in the hub.
//!
//! Inbound lines are capped at [`MAX_LINE_BYTES`]. Lines that are too long
//! or not UTF-8 are dropped like any other malformed message; only socket
//! errors and end of stream close the connection.

use crate::client_manager::OUTBOUND_QUEUE_CAPACITY;
use crate::config::ServerConfig;
use crate::hub::{spawn_reset_timer, Hub, HubError, HubHandle};
use crate::match_gen::{GenerationError, MatchGenerator};
use log::{debug, error, info, warn};
use shared::{Envelope, MessageType, ProtocolError, Update};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Longest line accepted from a client, newline excluded
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Failures that stop the server or end a single connection
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("match duration must be greater than zero")]
    ZeroMatchDuration,
    #[error("could not generate the first match: {0}")]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Hub(#[from] HubError),
}

/// A running server. Dropping the handle signals shutdown to every task.
pub struct ServerHandle {
    local_addr: SocketAddr,
    hub: HubHandle,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Address the listener actually bound, useful with port 0
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for talking to the running hub
    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Stops accepting, closes every connection and stops the hub
    pub fn shutdown(&self) {
        info!("Server shutting down");
        let _ = self.shutdown.send(true);
        let _ = self.hub.shutdown();
    }

    /// Waits for the accept loop, the hub and the reset timer to finish
    pub async fn wait(self) {
        let ServerHandle {
            shutdown, tasks, hub, ..
        } = self;
        // The hub also stops once the last handle is gone
        drop(hub);
        for task in tasks {
            if let Err(e) = task.await {
                error!("Server task failed: {}", e);
            }
        }
        drop(shutdown);
    }
}

/// Generates the first match, binds the listener and spawns the hub, the
/// reset timer and the accept loop
pub async fn launch(config: ServerConfig) -> Result<ServerHandle, ServerError> {
    if config.match_duration.is_zero() {
        return Err(ServerError::ZeroMatchDuration);
    }
    let generator = match config.seed {
        Some(seed) => MatchGenerator::seeded(config.layout.clone(), seed),
        None => MatchGenerator::from_entropy(config.layout.clone()),
    };
    let (hub, handle) = Hub::new(generator, config.match_duration, config.diamond_reward)?;

    let listener = TcpListener::bind(config.listen_addr.as_str())
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.listen_addr.clone(),
            source,
        })?;
    let local_addr = listener.local_addr()?;
    info!(
        "Server listening on {} with {:?} matches",
        local_addr, config.match_duration
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tasks = vec![
        tokio::spawn(hub.run()),
        spawn_reset_timer(handle.clone(), config.match_duration, shutdown_rx.clone()),
        tokio::spawn(accept_loop(listener, handle.clone(), shutdown_rx)),
    ];

    Ok(ServerHandle {
        local_addr,
        hub: handle,
        shutdown: shutdown_tx,
        tasks,
    })
}

/// Accepts connections until shutdown, one task per connection
async fn accept_loop(listener: TcpListener, hub: HubHandle, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    debug!("Accepted connection from {}", addr);
                    tokio::spawn(handle_connection(stream, addr, hub.clone(), shutdown.clone()));
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            },
            _ = shutdown.changed() => {
                debug!("Accept loop stopping");
                break;
            }
        }
    }
}

/// Runs one connection to completion and logs how it ended
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    hub: HubHandle,
    mut shutdown: watch::Receiver<bool>,
) {
    if let Err(e) = serve_connection(stream, addr, hub, &mut shutdown).await {
        warn!("Connection from {} ended with error: {}", addr, e);
    }
}

/// Name handshake, registration, then the read loop. Unregisters the
/// player however the read loop ends.
async fn serve_connection(
    stream: TcpStream,
    addr: SocketAddr,
    hub: HubHandle,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), ServerError> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::new();

    // First line is the raw display name
    let frame = tokio::select! {
        frame = read_frame(&mut reader, &mut buf, MAX_LINE_BYTES) => frame?,
        _ = shutdown.changed() => return Ok(()),
    };
    let name = match frame {
        Some(Frame::Line(name)) => name,
        Some(Frame::Malformed(reason)) => {
            warn!("Unusable name from {} ({}), using the default", addr, reason);
            String::new()
        }
        None => {
            debug!("{} closed before sending a name", addr);
            return Ok(());
        }
    };

    let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
    let client_id = hub.register(name, tx).await?;
    info!("Client {} connected from {}", client_id, addr);

    tokio::spawn(write_loop(write_half, rx, client_id, hub.clone()));

    let result = read_loop(&mut reader, &mut buf, client_id, &hub, shutdown).await;
    let _ = hub.unregister(client_id).await;
    result
}

/// Forwards updates to the hub until end of stream, a socket error or
/// shutdown. Malformed lines are logged and skipped.
async fn read_loop(
    reader: &mut BufReader<OwnedReadHalf>,
    buf: &mut Vec<u8>,
    client_id: u32,
    hub: &HubHandle,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), ServerError> {
    loop {
        let frame = tokio::select! {
            frame = read_frame(reader, buf, MAX_LINE_BYTES) => frame?,
            _ = shutdown.changed() => return Ok(()),
        };
        let line = match frame {
            Some(Frame::Line(line)) => line,
            Some(Frame::Malformed(reason)) => {
                warn!("Dropping message from client {}: {}", client_id, reason);
                continue;
            }
            None => {
                debug!("Client {} closed the connection", client_id);
                return Ok(());
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_update(&line) {
            Ok(update) => hub.update(client_id, update).await?,
            Err(e) => warn!("Dropping message from client {}: {}", client_id, e),
        }
    }
}

/// One newline-terminated unit read from a client
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Line(String),
    /// Consumed but unusable
    Malformed(&'static str),
}

/// Reads up to the next newline, keeping at most `max` bytes of it.
///
/// Longer lines are drained without being buffered and come back as
/// [`Frame::Malformed`], as do lines that are not UTF-8. A final line
/// without a newline is still returned. `None` means end of stream.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>, max: usize) -> io::Result<Option<Frame>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let mut read_any = false;
    let mut oversized = false;

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if !read_any {
                return Ok(None);
            }
            break;
        }
        read_any = true;

        let (chunk, consumed, done) = match available.iter().position(|b| *b == b'\n') {
            Some(i) => (&available[..i], i + 1, true),
            None => (available, available.len(), false),
        };
        if !oversized {
            if buf.len() + chunk.len() > max {
                oversized = true;
                buf.clear();
            } else {
                buf.extend_from_slice(chunk);
            }
        }
        reader.consume(consumed);
        if done {
            break;
        }
    }

    if oversized {
        return Ok(Some(Frame::Malformed("line too long")));
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(Some(match std::str::from_utf8(buf) {
        Ok(line) => Frame::Line(line.to_string()),
        Err(_) => Frame::Malformed("invalid UTF-8"),
    }))
}

/// Drains the outbound queue onto the socket. Ends when the hub drops the
/// client's sender or a write fails.
async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Envelope>,
    client_id: u32,
    hub: HubHandle,
) {
    while let Some(envelope) = outbound.recv().await {
        let line = match envelope.to_line() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to encode message for client {}: {}", client_id, e);
                continue;
            }
        };
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            warn!("Failed to write to client {}: {}", client_id, e);
            let _ = hub.unregister(client_id).await;
            break;
        }
    }
    let _ = writer.shutdown().await;
}

/// Clients may only send position updates
pub fn parse_update(line: &str) -> Result<Update, ProtocolError> {
    Envelope::from_line(line)?.payload(MessageType::Update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use shared::{JoinAccepted, Point, ServerEvent};

    fn test_config() -> ServerConfig {
        ServerConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            layout: LayoutConfig {
                attempts: 5_000,
                ..LayoutConfig::default()
            },
            seed: Some(5),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_parse_update() {
        let envelope = Envelope::new(
            MessageType::Update,
            &Update::claiming(Point::new(4, 5).unwrap(), 2),
        )
        .unwrap();
        let update = parse_update(&envelope.to_line().unwrap()).unwrap();
        assert_eq!(update.position, Point::new(4, 5).unwrap());
        assert_eq!(update.claimed_diamond(), Some(2));
    }

    #[test]
    fn test_parse_update_rejects_other_types() {
        let line = Envelope::text("hi").to_line().unwrap();
        assert!(matches!(
            parse_update(&line),
            Err(ProtocolError::UnexpectedType { .. })
        ));
        assert!(matches!(
            parse_update("not json"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_server_error_messages() {
        let err = ServerError::Generation(GenerationError::TooFewRooms {
            generated: 0,
            required: 1,
        });
        assert!(err.to_string().contains("0 rooms"));
        assert_eq!(
            ServerError::Hub(HubError::Closed).to_string(),
            "session hub is no longer running"
        );
    }

    #[tokio::test]
    async fn test_zero_match_duration_rejected() {
        let config = ServerConfig {
            match_duration: Duration::ZERO,
            ..test_config()
        };
        assert!(matches!(
            launch(config).await,
            Err(ServerError::ZeroMatchDuration)
        ));
    }

    #[tokio::test]
    async fn test_read_frame_drops_bad_lines() {
        let mut input: &[u8] = b"first\r\n\xff\xfe!\n0123456789abcdef\nsecond\nlast";
        let mut buf = Vec::new();
        let mut frames = Vec::new();
        while let Some(frame) = read_frame(&mut input, &mut buf, 8).await.unwrap() {
            frames.push(frame);
        }

        assert_eq!(
            frames,
            vec![
                Frame::Line("first".to_string()),
                Frame::Malformed("invalid UTF-8"),
                Frame::Malformed("line too long"),
                Frame::Line("second".to_string()),
                Frame::Line("last".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_read_frame_drains_long_line_in_small_reads() {
        let long = vec![b'x'; 100];
        let mut data = long.clone();
        data.push(b'\n');
        data.extend_from_slice(b"ok\n");
        // A tiny buffer forces the long line to arrive over many reads
        let mut reader = BufReader::with_capacity(4, data.as_slice());
        let mut buf = Vec::new();

        assert_eq!(
            read_frame(&mut reader, &mut buf, 16).await.unwrap(),
            Some(Frame::Malformed("line too long"))
        );
        assert!(buf.len() <= 16);
        assert_eq!(
            read_frame(&mut reader, &mut buf, 16).await.unwrap(),
            Some(Frame::Line("ok".to_string()))
        );
        assert_eq!(read_frame(&mut reader, &mut buf, 16).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bind_failure_reported() {
        let config = ServerConfig {
            listen_addr: "not an address".to_string(),
            ..test_config()
        };
        assert!(matches!(launch(config).await, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_handshake_over_tcp() {
        let server = launch(test_config()).await.unwrap();
        let stream = TcpStream::connect(server.local_addr()).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        write_half.write_all(b"tester\n").await.unwrap();

        let mut lines = BufReader::new(read_half).lines();
        let first = Envelope::from_line(&lines.next_line().await.unwrap().unwrap()).unwrap();
        let second = Envelope::from_line(&lines.next_line().await.unwrap().unwrap()).unwrap();

        assert_eq!(
            ServerEvent::try_from(&first).unwrap(),
            ServerEvent::JoinAccepted(JoinAccepted { id: 1 })
        );
        assert_eq!(second.kind, MessageType::GameInitialization);

        server.shutdown();
        server.wait().await;
    }
}
