//! Async length-prefixed framing.
//!
//! This module provides async versions of the codec functions for use with tokio.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::codec::{decode_header, encode_frame, HEADER_LEN};
use crate::error::Result;

/// Read a complete frame from an async stream.
pub async fn read_frame_async<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;

    let mut payload = vec![0u8; decode_header(header) as usize];
    if !payload.is_empty() {
        reader.read_exact(&mut payload).await?;
    }
    Ok(payload)
}

/// Write a complete frame to an async stream.
pub async fn write_frame_async<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let frame = encode_frame(payload)?;
    writer.write_all(&frame).await?;
    Ok(())
}
