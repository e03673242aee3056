// Length-prefixed framing and single-connection I/O

use crate::config::NodeConfig;
use crate::error::ProtocolError;
use crate::network::Message;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Frame header: payload length as u32 big-endian
const HEADER_LEN: usize = 4;

/// Write one frame: 4-byte length followed by the payload
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
    max_len: usize,
) -> Result<(), ProtocolError> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|&len| len as usize <= max_len)
        .ok_or(ProtocolError::FrameTooLarge { len: payload.len(), max: max_len })?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame. Oversized frames are refused before the payload is read.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_len: usize,
) -> Result<Vec<u8>, ProtocolError> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;

    let len = u32::from_be_bytes(header) as usize;
    if len > max_len {
        return Err(ProtocolError::FrameTooLarge { len, max: max_len });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// One TCP connection carrying framed messages
pub struct Connection {
    stream: TcpStream,
    addr: SocketAddr,
    max_frame_len: usize,
    io_timeout: Duration,
}

impl Connection {
    /// Wrap an accepted stream
    pub fn new(stream: TcpStream, addr: SocketAddr, config: &NodeConfig) -> Self {
        Self {
            stream,
            addr,
            max_frame_len: config.max_frame_len,
            io_timeout: config.io_timeout,
        }
    }

    /// Connect to the configured server
    pub async fn connect(config: &NodeConfig) -> Result<Self, ProtocolError> {
        let target = config.server_addr();
        let stream = with_timeout(config.io_timeout, async {
            TcpStream::connect(&target).await.map_err(ProtocolError::from)
        })
        .await?;
        let addr = stream.peer_addr()?;

        Ok(Self::new(stream, addr, config))
    }

    /// Send a message to the peer
    pub async fn send_message(&mut self, message: &Message) -> Result<(), ProtocolError> {
        let payload = message.to_bytes()?;
        let max = self.max_frame_len;
        with_timeout(self.io_timeout, write_frame(&mut self.stream, &payload, max)).await
    }

    /// Receive a message from the peer
    pub async fn receive_message(&mut self) -> Result<Message, ProtocolError> {
        let max = self.max_frame_len;
        let payload = with_timeout(self.io_timeout, read_frame(&mut self.stream, max)).await?;
        Message::from_bytes(&payload)
    }

    /// Get peer address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, ProtocolError>
where
    F: Future<Output = Result<T, ProtocolError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| ProtocolError::Timeout(limit))?
}
