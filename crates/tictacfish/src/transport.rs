//! Length-delimited framing and connection tasks.
//!
//! A frame is a 4-byte big-endian payload length followed by the payload. One
//! frame carries one [`Envelope`]. Each connection runs a reader task and a
//! writer task; when the reader stops, the link is closed and the inbound
//! handler is told the peer is gone.

use crate::envelope::Envelope;
use crate::error::ActorError;
use crate::rpc::{self, InboundHandler, PeerLink};
use std::sync::Arc;
use std::time::Duration;
use tictacfish_game::PeerId;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Bytes in a frame header.
pub const FRAME_HEADER_LEN: usize = 4;

/// Failure reading or writing a frame.
#[derive(Debug, derive_more::Display)]
pub enum FrameError {
    /// Underlying I/O failed.
    #[display("io error: {}", _0)]
    Io(std::io::Error),

    /// A zero-length frame was read.
    #[display("frame length cannot be zero")]
    EmptyFrame,

    /// A frame exceeded the configured limit.
    #[display("frame too large: max {max_frame_bytes} got {got_bytes}")]
    FrameTooLarge {
        /// Configured limit.
        max_frame_bytes: usize,
        /// Announced or attempted length.
        got_bytes: usize,
    },
}

impl std::error::Error for FrameError {}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Encodes a payload as one frame.
pub fn encode_frame(payload: &[u8], max_frame_bytes: usize) -> Result<Vec<u8>, FrameError> {
    if payload.is_empty() {
        return Err(FrameError::EmptyFrame);
    }
    if payload.len() > max_frame_bytes {
        return Err(FrameError::FrameTooLarge {
            max_frame_bytes,
            got_bytes: payload.len(),
        });
    }
    let length = u32::try_from(payload.len()).map_err(|_| FrameError::FrameTooLarge {
        max_frame_bytes,
        got_bytes: payload.len(),
    })?;
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Reads frames from a byte stream.
pub struct FrameReader<R> {
    reader: R,
    max_frame_bytes: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wraps a reader.
    pub fn new(reader: R, max_frame_bytes: usize) -> Self {
        Self {
            reader,
            max_frame_bytes,
        }
    }

    /// Reads the next frame payload; `None` on a clean end of stream.
    pub async fn read_next(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        let mut header = [0u8; FRAME_HEADER_LEN];
        let mut read = 0usize;
        while read < header.len() {
            let n = self.reader.read(&mut header[read..]).await?;
            if n == 0 {
                if read == 0 {
                    return Ok(None);
                }
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "frame header truncated",
                )
                .into());
            }
            read += n;
        }

        let length = u32::from_be_bytes(header) as usize;
        if length == 0 {
            return Err(FrameError::EmptyFrame);
        }
        if length > self.max_frame_bytes {
            return Err(FrameError::FrameTooLarge {
                max_frame_bytes: self.max_frame_bytes,
                got_bytes: length,
            });
        }

        let mut body = vec![0u8; length];
        self.reader.read_exact(&mut body).await?;
        Ok(Some(body))
    }
}

/// Writes frames to a byte stream.
pub struct FrameWriter<W> {
    writer: W,
    max_frame_bytes: usize,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wraps a writer.
    pub fn new(writer: W, max_frame_bytes: usize) -> Self {
        Self {
            writer,
            max_frame_bytes,
        }
    }

    /// Writes one frame and flushes; returns bytes written.
    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<usize, FrameError> {
        let frame = encode_frame(payload, self.max_frame_bytes)?;
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(frame.len())
    }

    /// Shuts the write side down, signalling end of stream to the peer.
    pub async fn shutdown(&mut self) -> Result<(), FrameError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Opens the single outbound connection a connecting process needs.
///
/// # Errors
///
/// [`ActorError::ConfigurationFatal`] if the peer cannot be reached.
#[instrument]
pub async fn dial(address: &str) -> Result<TcpStream, ActorError> {
    let stream = TcpStream::connect(address)
        .await
        .map_err(|e| ActorError::fatal(format!("cannot connect to {address}: {e}")))?;
    stream
        .set_nodelay(true)
        .map_err(|e| ActorError::fatal(format!("cannot configure connection to {address}: {e}")))?;
    info!(address, "Connected");
    Ok(stream)
}

/// Starts reader and writer tasks for `stream` and returns its link.
#[instrument(skip(stream, handler))]
pub fn spawn_connection<S>(
    stream: S,
    peer: PeerId,
    call_timeout: Duration,
    max_frame_bytes: usize,
    handler: Arc<dyn InboundHandler>,
) -> Arc<PeerLink>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let (link, outbound) = PeerLink::new(peer, call_timeout, max_frame_bytes);

    tokio::spawn(write_loop(
        peer,
        FrameWriter::new(write_half, max_frame_bytes),
        outbound,
    ));
    tokio::spawn(read_loop(
        FrameReader::new(read_half, max_frame_bytes),
        link.clone(),
        handler,
    ));

    debug!("Connection tasks started");
    link
}

async fn write_loop<W: AsyncWrite + Unpin>(
    peer: PeerId,
    mut writer: FrameWriter<W>,
    mut outbound: mpsc::UnboundedReceiver<Envelope>,
) {
    while let Some(envelope) = outbound.recv().await {
        let written = match envelope.encode() {
            Ok(bytes) => writer.write_frame(&bytes).await,
            Err(e) => {
                warn!(%peer, error = %e, "Dropping unencodable envelope");
                continue;
            }
        };
        match written {
            Ok(_) => {}
            Err(e @ (FrameError::FrameTooLarge { .. } | FrameError::EmptyFrame)) => {
                warn!(%peer, error = %e, "Dropping unframeable envelope");
            }
            Err(e) => {
                warn!(%peer, error = %e, "Write failed, stopping writer");
                break;
            }
        }
    }
    if let Err(e) = writer.shutdown().await {
        debug!(%peer, error = %e, "Shutdown after writer stop failed");
    }
}

async fn read_loop<R: AsyncRead + Unpin>(
    mut reader: FrameReader<R>,
    link: Arc<PeerLink>,
    handler: Arc<dyn InboundHandler>,
) {
    let peer = link.peer();
    loop {
        match reader.read_next().await {
            Ok(Some(bytes)) => match Envelope::decode(&bytes) {
                Ok(envelope) => rpc::route(handler.clone(), link.clone(), envelope),
                Err(e) => warn!(%peer, error = %e, "Discarding malformed envelope"),
            },
            Ok(None) => {
                info!(%peer, "Peer closed the connection");
                break;
            }
            Err(e) => {
                warn!(%peer, error = %e, "Connection failed");
                break;
            }
        }
    }
    link.close();
    handler.connection_lost(peer);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_cross_a_stream() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = FrameWriter::new(client, 256);
        let mut reader = FrameReader::new(server, 256);

        writer.write_frame(b"hello").await.unwrap();
        writer.write_frame(b"fish").await.unwrap();
        writer.shutdown().await.unwrap();

        assert_eq!(reader.read_next().await.unwrap(), Some(b"hello".to_vec()));
        assert_eq!(reader.read_next().await.unwrap(), Some(b"fish".to_vec()));
        assert_eq!(reader.read_next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected_on_read() {
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(&1000u32.to_be_bytes()).await.unwrap();
        let mut reader = FrameReader::new(server, 16);
        assert!(matches!(
            reader.read_next().await,
            Err(FrameError::FrameTooLarge { got_bytes: 1000, .. })
        ));
    }

    #[tokio::test]
    async fn test_truncated_header_is_an_error() {
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(&[0, 0]).await.unwrap();
        drop(client);
        let mut reader = FrameReader::new(server, 16);
        assert!(matches!(reader.read_next().await, Err(FrameError::Io(_))));
    }

    #[test]
    fn test_encode_rejects_empty_and_oversized() {
        assert!(matches!(encode_frame(b"", 8), Err(FrameError::EmptyFrame)));
        assert!(matches!(
            encode_frame(&[1; 9], 8),
            Err(FrameError::FrameTooLarge { got_bytes: 9, .. })
        ));
        assert_eq!(encode_frame(b"ab", 8).unwrap(), vec![0, 0, 0, 2, b'a', b'b']);
    }
}
