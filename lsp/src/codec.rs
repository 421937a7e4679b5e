//! JSON-RPC framing codec for the LSP transport.
//!
//! LSP uses `Content-Length: N\r\n\r\n{json}` framing over stdin/stdout.
//! [`FrameReader`] and [`FrameWriter`] read and write framed messages over
//! any async byte stream; the dispatcher owns the reader, the writer task
//! owns the writer (which is what serializes writes).

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::protocol::Request;

/// Maximum frame size (4 MiB) to prevent unbounded allocation.
const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

/// Framing failures, one variant per failure mode.
///
/// [`FrameError::Eof`] is terminal — the peer closed the stream and the
/// server shuts down. Everything else leaves the reader in an undefined
/// position and is logged by the read loop.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("connection closed")]
    Eof,
    #[error("malformed frame header: {0}")]
    MalformedHeader(String),
    #[error("missing or invalid Content-Length header")]
    ContentLength,
    #[error("Content-Length {0} exceeds maximum {MAX_FRAME_BYTES}")]
    Oversized(usize),
    #[error("frame body ended early")]
    ShortRead,
    #[error("frame body JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads framed JSON-RPC messages from an async reader.
pub struct FrameReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Read the next request frame.
    pub async fn read(&mut self) -> Result<Request, FrameError> {
        let body = self.read_body().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Read the next frame as raw JSON. Used by test clients that need to
    /// observe responses on the other end of the stream.
    pub async fn read_value(&mut self) -> Result<serde_json::Value, FrameError> {
        let body = self.read_body().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn read_body(&mut self) -> Result<Vec<u8>, FrameError> {
        let content_length = self.read_headers().await?;
        if content_length > MAX_FRAME_BYTES {
            return Err(FrameError::Oversized(content_length));
        }

        let mut body = vec![0u8; content_length];
        self.reader.read_exact(&mut body).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                FrameError::ShortRead
            } else {
                FrameError::Io(err)
            }
        })?;
        Ok(body)
    }

    /// Parse headers until the blank separator line.
    ///
    /// EOF before any header byte is a clean [`FrameError::Eof`]; EOF in the
    /// middle of a header block is malformed.
    async fn read_headers(&mut self) -> Result<usize, FrameError> {
        let mut content_length: Option<usize> = None;
        let mut line = String::new();
        let mut saw_any_header_bytes = false;

        loop {
            line.clear();
            let bytes_read = self.reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                if !saw_any_header_bytes {
                    return Err(FrameError::Eof);
                }
                return Err(FrameError::MalformedHeader(
                    "unexpected EOF while reading headers".to_string(),
                ));
            }
            saw_any_header_bytes = true;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }

            let Some(colon) = trimmed.find(':') else {
                return Err(FrameError::MalformedHeader(trimmed.to_string()));
            };
            // The LSP spec spells it "Content-Length"; parse
            // case-insensitively and ignore other headers (Content-Type).
            if trimmed[..colon].eq_ignore_ascii_case("Content-Length") {
                let value = trimmed[colon + 1..].trim();
                content_length = Some(value.parse().map_err(|_| FrameError::ContentLength)?);
            }
        }

        content_length.ok_or(FrameError::ContentLength)
    }
}

/// Writes framed JSON-RPC messages to an async writer.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialize, frame, write, and flush one message.
    pub async fn write(&mut self, msg: &impl serde::Serialize) -> Result<(), FrameError> {
        let body = serde_json::to_string(msg)?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());

        self.writer.write_all(header.as_bytes()).await?;
        self.writer.write_all(body.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
