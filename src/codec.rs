//! Length-prefixed framing.
//!
//! Every message on the wire is a 4-byte unsigned length `N` in little-endian
//! byte order followed by exactly `N` payload bytes:
//!
//! ```text
//! +--------+--------+--------+--------+--------- ... ---------+
//! |      payload length N (u32 LE)    |   N payload bytes     |
//! +--------+--------+--------+--------+--------- ... ---------+
//! ```
//!
//! There is no checksum, type tag or byte-order negotiation.

use std::io::{self, Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{EngineError, Result};

/// Size of the frame header.
pub const HEADER_LEN: usize = 4;

/// Encode a payload length as a frame header.
pub fn encode_header(len: u32) -> [u8; HEADER_LEN] {
    len.to_le_bytes()
}

/// Decode a frame header into a payload length.
pub fn decode_header(header: [u8; HEADER_LEN]) -> u32 {
    u32::from_le_bytes(header)
}

fn frame_len(payload: &[u8]) -> Result<u32> {
    u32::try_from(payload.len()).map_err(|_| EngineError::PacketTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })
}

/// Encode a payload into a complete frame.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes> {
    let len = frame_len(payload)?;
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u32_le(len);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Write a complete frame to a stream.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let len = frame_len(payload)?;
    writer.write_all(&encode_header(len))?;
    writer.write_all(payload)?;
    Ok(())
}

/// Read a complete frame from a stream.
///
/// Blocks until the whole frame has arrived.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header)?;

    let mut payload = vec![0u8; decode_header(header) as usize];
    if !payload.is_empty() {
        reader.read_exact(&mut payload)?;
    }
    Ok(payload)
}

/// How an attempt to fill a buffer ended.
#[derive(Debug)]
pub enum ReadOutcome {
    /// The buffer was filled.
    Complete,
    /// End of stream before any byte arrived.
    Closed,
    /// End of stream after `received` bytes.
    Short { received: usize },
    /// Read error after `received` bytes.
    Failed { received: usize, error: io::Error },
}

/// Fill `buf` from `reader`, reporting how far it got.
///
/// Unlike [`Read::read_exact`], this keeps the distinction between a stream
/// that ended cleanly before the read and one that ended part-way through.
pub fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> ReadOutcome {
    let mut received = 0;
    while received < buf.len() {
        match reader.read(&mut buf[received..]) {
            Ok(0) if received == 0 => return ReadOutcome::Closed,
            Ok(0) => return ReadOutcome::Short { received },
            Ok(n) => received += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return ReadOutcome::Failed { received, error },
        }
    }
    ReadOutcome::Complete
}

/// Incremental frame decoder.
///
/// Accumulates bytes until complete frames are available.
#[derive(Debug)]
pub struct FrameReader {
    buffer: BytesMut,
    max_frame: usize,
}

impl FrameReader {
    /// Create a new frame reader accepting frames of any size.
    pub fn new() -> Self {
        Self::with_max_frame(u32::MAX as usize)
    }

    /// Create a new frame reader rejecting payloads above `max_frame` bytes.
    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            max_frame,
        }
    }

    /// Add data to the internal buffer.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to take one complete payload from the buffer.
    ///
    /// Returns `Some(payload)` if a complete frame is available,
    /// `None` if more data is needed.
    pub fn try_parse(&mut self) -> Result<Option<Bytes>> {
        if self.buffer.len() < HEADER_LEN {
            return Ok(None);
        }

        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&self.buffer[..HEADER_LEN]);
        let len = decode_header(header) as usize;
        if len > self.max_frame {
            return Err(EngineError::PacketTooLarge {
                size: len,
                max: self.max_frame,
            });
        }

        if self.buffer.len() < HEADER_LEN + len {
            return Ok(None);
        }

        self.buffer.advance(HEADER_LEN);
        Ok(Some(self.buffer.split_to(len).freeze()))
    }

    /// Take all complete payloads from the buffer.
    pub fn parse_all(&mut self) -> Result<Vec<Bytes>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.try_parse()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}
