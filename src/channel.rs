//! Framed peer transport over one long-lived TCP connection.
//!
//! Each frame is a 2-byte big-endian length followed by a UTF-8 body.
//! One side listens and accepts exactly one peer; the other dials.

use crate::protocol::{PeerMessage, ProtocolError};
use bytes::Bytes;
use derive_more::{Display, From};
use futures::{SinkExt, StreamExt};
use peer_chess_rules::Color;
use std::net::SocketAddr;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use tracing::{debug, info, instrument};

/// Well-known port both peers use.
pub const DEFAULT_PORT: u16 = 55555;

/// Which end of the connection this peer is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Listens for the opponent and plays White.
    Host,
    /// Dials the host at the given address and plays Black.
    Join(String),
}

impl Role {
    /// Color played in this role.
    pub fn color(&self) -> Color {
        match self {
            Role::Host => Color::White,
            Role::Join(_) => Color::Black,
        }
    }
}

/// Transport failure.
#[derive(Debug, Display, From)]
pub enum ChannelError {
    /// Socket error.
    #[display("I/O error: {_0}")]
    Io(std::io::Error),

    /// Frame body could not be decoded.
    #[display("{_0}")]
    Protocol(ProtocolError),
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChannelError::Io(err) => Some(err),
            ChannelError::Protocol(err) => Some(err),
        }
    }
}

fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(2)
        .max_frame_length(u16::MAX as usize)
        .new_codec()
}

/// A bound listener waiting for the single opponent.
#[derive(Debug)]
pub struct PeerListener {
    listener: TcpListener,
}

impl PeerListener {
    /// Binds the listening socket.
    #[instrument(skip(addr))]
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, ChannelError> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "Listening for opponent");
        Ok(Self { listener })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, ChannelError> {
        Ok(self.listener.local_addr()?)
    }

    /// Waits for exactly one peer, then stops listening.
    #[instrument(skip(self))]
    pub async fn accept(self) -> Result<PeerChannel, ChannelError> {
        let (stream, peer) = self.listener.accept().await?;
        info!(%peer, "Opponent connected");
        PeerChannel::from_stream(stream)
    }
}

/// An established connection to the peer.
#[derive(Debug)]
pub struct PeerChannel {
    stream: TcpStream,
    peer: SocketAddr,
}

impl PeerChannel {
    /// Establishes the connection for `role`. Blocks until a peer is connected.
    #[instrument]
    pub async fn establish(role: &Role, port: u16) -> Result<Self, ChannelError> {
        match role {
            Role::Host => PeerListener::bind(("0.0.0.0", port)).await?.accept().await,
            Role::Join(address) => Self::dial((address.as_str(), port)).await,
        }
    }

    /// Dials the listening peer.
    #[instrument(skip(addr))]
    pub async fn dial(addr: impl ToSocketAddrs) -> Result<Self, ChannelError> {
        let stream = TcpStream::connect(addr).await?;
        info!(peer = %stream.peer_addr()?, "Connected to host");
        Self::from_stream(stream)
    }

    fn from_stream(stream: TcpStream) -> Result<Self, ChannelError> {
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        Ok(Self { stream, peer })
    }

    /// Remote address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Splits into independently owned send and receive halves.
    pub fn split(self) -> (PeerSender, PeerReceiver) {
        let (read, write) = self.stream.into_split();
        (
            PeerSender {
                frames: FramedWrite::new(write, codec()),
            },
            PeerReceiver {
                frames: FramedRead::new(read, codec()),
            },
        )
    }
}

/// Outbound half: writes one frame per message.
#[derive(Debug)]
pub struct PeerSender {
    frames: FramedWrite<OwnedWriteHalf, LengthDelimitedCodec>,
}

impl PeerSender {
    /// Writes and flushes one message.
    #[instrument(skip(self, message), fields(%message))]
    pub async fn send(&mut self, message: &PeerMessage) -> Result<(), ChannelError> {
        self.frames.send(Bytes::from(message.encode())).await?;
        debug!("Frame sent");
        Ok(())
    }
}

/// Inbound half: reads one frame at a time.
#[derive(Debug)]
pub struct PeerReceiver {
    frames: FramedRead<OwnedReadHalf, LengthDelimitedCodec>,
}

impl PeerReceiver {
    /// Waits for the next message. `None` once the peer closed the stream.
    pub async fn next(&mut self) -> Option<Result<PeerMessage, ChannelError>> {
        let frame = match self.frames.next().await? {
            Ok(frame) => frame,
            Err(err) => return Some(Err(err.into())),
        };
        Some(decode(&frame))
    }
}

fn decode(frame: &[u8]) -> Result<PeerMessage, ChannelError> {
    let body = std::str::from_utf8(frame)
        .map_err(|e| ProtocolError::new(format!("Frame is not UTF-8: {e}")))?;
    Ok(PeerMessage::parse(body)?)
}
