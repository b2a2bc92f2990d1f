//! TCP mesh transport
//!
//! Every instance listens for inbound peers and dials its bootstrap list.
//! A connection opens with a one-line [`Handshake`]; peers on another topic
//! are dropped. After that each line is one opaque message, handed to the
//! frame loop as a [`MeshEvent`] without any decoding. Sends are
//! fire-and-forget.

use std::io;
use std::net::SocketAddr;

use bytes::Bytes;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;

use super::protocol::{decode_handshake, encode_handshake, Handshake};

/// Identifies one transport connection
pub type ConnId = Uuid;

/// Longest accepted line, newline excluded. Longer lines close the connection.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Transport settings
#[derive(Debug, Clone)]
pub struct MeshConfig {
    pub listen: SocketAddr,
    pub bootstrap: Vec<SocketAddr>,
}

impl From<&Config> for MeshConfig {
    fn from(config: &Config) -> Self {
        Self {
            listen: config.mesh_listen,
            bootstrap: config.mesh_peers.clone(),
        }
    }
}

/// Channel handle to one connected peer
#[derive(Debug, Clone)]
pub struct PeerLink {
    conn: ConnId,
    remote_key: String,
    tx: mpsc::UnboundedSender<Bytes>,
}

impl PeerLink {
    pub fn new(conn: ConnId, remote_key: String, tx: mpsc::UnboundedSender<Bytes>) -> Self {
        Self {
            conn,
            remote_key,
            tx,
        }
    }

    pub fn conn(&self) -> ConnId {
        self.conn
    }

    /// Public key the peer announced in its handshake
    pub fn remote_key(&self) -> &str {
        &self.remote_key
    }

    /// Queue a message; returns false once the connection is gone
    pub fn send(&self, payload: Bytes) -> bool {
        self.tx.send(payload).is_ok()
    }
}

/// Transport callbacks delivered to the frame loop
#[derive(Debug)]
pub enum MeshEvent {
    Connected(PeerLink),
    Data { conn: ConnId, payload: Bytes },
    Closed { conn: ConnId },
}

/// A joined mesh
pub struct Mesh {
    local_addr: SocketAddr,
}

impl Mesh {
    /// Bind the listener, dial bootstrap peers, and start forwarding events
    pub async fn join(
        config: MeshConfig,
        topic: String,
        local_key: String,
    ) -> Result<(Self, mpsc::UnboundedReceiver<MeshEvent>), MeshError> {
        let listener = TcpListener::bind(config.listen)
            .await
            .map_err(|source| MeshError::Bind {
                addr: config.listen,
                source,
            })?;
        let local_addr = listener.local_addr()?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        info!(addr = %local_addr, topic = %topic, "Mesh listening");

        let accept_topic = topic.clone();
        let accept_key = local_key.clone();
        let accept_events = events_tx.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, remote)) => {
                        debug!(remote = %remote, "Inbound peer connection");
                        tokio::spawn(run_connection(
                            stream,
                            accept_topic.clone(),
                            accept_key.clone(),
                            accept_events.clone(),
                        ));
                    }
                    Err(e) => {
                        warn!(error = %e, "Accept failed");
                    }
                }
            }
        });

        for addr in config.bootstrap {
            let topic = topic.clone();
            let local_key = local_key.clone();
            let events = events_tx.clone();
            tokio::spawn(async move {
                match TcpStream::connect(addr).await {
                    Ok(stream) => {
                        debug!(remote = %addr, "Dialed bootstrap peer");
                        run_connection(stream, topic, local_key, events).await;
                    }
                    Err(e) => {
                        warn!(remote = %addr, error = %e, "Failed to dial bootstrap peer");
                    }
                }
            });
        }

        Ok((Self { local_addr }, events_rx))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// Drive one connection: handshake, then forward lines until either side closes
async fn run_connection(
    stream: TcpStream,
    topic: String,
    local_key: String,
    events: mpsc::UnboundedSender<MeshEvent>,
) {
    let remote = stream.peer_addr().ok();
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    let hello = Handshake {
        topic: topic.clone(),
        key: local_key.clone(),
    };
    let hello = match encode_handshake(&hello) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Failed to encode handshake");
            return;
        }
    };
    if let Err(e) = write_line(&mut writer, &hello).await {
        debug!(remote = ?remote, error = %e, "Handshake send failed");
        return;
    }

    let theirs = match read_line(&mut reader, &mut buf).await {
        Ok(Line::Data(line)) => match decode_handshake(&line) {
            Ok(handshake) => handshake,
            Err(e) => {
                warn!(remote = ?remote, error = %e, "Bad handshake");
                return;
            }
        },
        Ok(Line::Eof) => return,
        Ok(Line::TooLong) => {
            warn!(remote = ?remote, max = MAX_LINE_BYTES, "Handshake too long, dropping");
            return;
        }
        Err(e) => {
            debug!(remote = ?remote, error = %e, "Handshake read failed");
            return;
        }
    };

    if theirs.topic != topic {
        warn!(remote = ?remote, topic = %theirs.topic, "Peer on another topic, dropping");
        return;
    }
    if theirs.key == local_key {
        debug!(remote = ?remote, "Connected to self, dropping");
        return;
    }

    let conn = Uuid::new_v4();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Bytes>();
    let link = PeerLink::new(conn, theirs.key.clone(), out_tx);

    if events.send(MeshEvent::Connected(link)).is_err() {
        return;
    }
    info!(conn = %conn, peer = %theirs.key, remote = ?remote, "Peer connected");

    // Writer task: queued messages -> socket
    let writer_handle = tokio::spawn(async move {
        while let Some(payload) = out_rx.recv().await {
            if let Err(e) = write_line(&mut writer, &payload).await {
                debug!(conn = %conn, error = %e, "Peer send failed");
                break;
            }
        }
    });

    // Reader loop: socket -> frame loop
    loop {
        match read_line(&mut reader, &mut buf).await {
            Ok(Line::Data(line)) => {
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                if events.send(MeshEvent::Data { conn, payload: line }).is_err() {
                    break;
                }
            }
            Ok(Line::Eof) => break,
            Ok(Line::TooLong) => {
                warn!(conn = %conn, max = MAX_LINE_BYTES, "Peer line too long, closing");
                break;
            }
            Err(e) => {
                debug!(conn = %conn, error = %e, "Peer read failed");
                break;
            }
        }
    }

    writer_handle.abort();
    let _ = events.send(MeshEvent::Closed { conn });
    info!(conn = %conn, "Peer connection closed");
}

/// One read off a connection
#[derive(Debug, PartialEq)]
enum Line {
    /// Raw bytes with the line ending stripped, not necessarily UTF-8
    Data(Bytes),
    Eof,
    TooLong,
}

async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Line>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = MAX_LINE_BYTES as u64 + 1;
    let read = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if read == 0 {
        return Ok(Line::Eof);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if buf.len() > MAX_LINE_BYTES {
        return Ok(Line::TooLong);
    }
    Ok(Line::Data(Bytes::copy_from_slice(buf)))
}

async fn write_line<W>(writer: &mut W, payload: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(payload).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("Failed to bind mesh listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Mesh I/O error: {0}")]
    Io(#[from] std::io::Error),
}
