//! Browser native-messaging framing.
//!
//! Each message is a `u32` length in native byte order followed by that many
//! bytes of UTF-8 JSON.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{trace, warn};

/// Largest message the browser accepts from a host.
pub const MAX_OUTBOUND_FRAME: usize = 1024 * 1024;
/// Largest message the browser may send to a host.
pub const MAX_INBOUND_FRAME: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: usize, max: usize },
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub type WireResult<T> = std::result::Result<T, WireError>;

/// Reads one frame. Returns `None` on a clean end of stream before the
/// length prefix.
pub async fn read_frame<R>(reader: &mut R) -> WireResult<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 4];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_ne_bytes(prefix) as usize;
    if len > MAX_INBOUND_FRAME {
        warn!(len, "inbound frame too large");
        return Err(WireError::TooLarge {
            len,
            max: MAX_INBOUND_FRAME,
        });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    trace!(len, "frame read");
    Ok(Some(body))
}

pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> WireResult<()>
where
    W: AsyncWrite + Unpin,
{
    if body.len() > MAX_OUTBOUND_FRAME {
        warn!(len = body.len(), "outbound frame too large");
        return Err(WireError::TooLarge {
            len: body.len(),
            max: MAX_OUTBOUND_FRAME,
        });
    }

    let len = body.len() as u32;
    writer.write_all(&len.to_ne_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    trace!(len, "frame written");
    Ok(())
}

/// Reads and decodes one JSON message.
pub async fn read_message<R, T>(reader: &mut R) -> WireResult<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    match read_frame(reader).await? {
        Some(body) => Ok(Some(serde_json::from_slice(&body)?)),
        None => Ok(None),
    }
}

pub async fn write_message<W, T>(writer: &mut W, message: &T) -> WireResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(message)?;
    write_frame(writer, &body).await
}
