//! Synchronous TCP client engine built on std::net.
//!
//! This crate provides a blocking TCP client that exchanges
//! length-prefixed frames with a peer, together with the byte buffer
//! type those frames are carried in.
//!
//! # Features
//!
//! - [`Packet`] buffers that either own their bytes or view caller memory
//! - Selectable locking: mutex, reentrant, or none for single-threaded use
//! - Connect over every resolved address with optional timeouts
//! - Receive with a bounded wait and a classified failure status
//! - Disconnect notification through a [`ClientCallback`]
//!
//! # Cargo Features
//!
//! - `tokio`: async framing in `codec_async` (`read_frame_async`,
//!   `write_frame_async`) for peers built on tokio streams
//!
//! # Example
//!
//! ```no_run
//! use framelink::{ClientConfig, Packet, SyncTcpClient};
//! use std::time::Duration;
//!
//! let client = SyncTcpClient::new(ClientConfig::new("127.0.0.1", "8988"));
//! client.connect(None, None).unwrap();
//!
//! client.send_framed(&Packet::owned(b"hello"), None).unwrap();
//! match client.receive(Some(Duration::from_secs(1))) {
//!     Ok(packet) => println!("Received {} bytes", packet.len()),
//!     Err(e) => println!("Receive failed: {e}"),
//! }
//! ```
//!
//! # Wire Format
//!
//! Every frame is a 4-byte little-endian length followed by that many
//! payload bytes:
//!
//! ```text
//! +--------+--------+--------+--------+
//! |        Length N (u32, LE)         |  (4 bytes)
//! +--------+--------+--------+--------+
//! |           Payload ...             |  (N bytes)
//! +--------+--------+--------+--------+
//! ```

pub mod client;
pub mod codec;
pub mod connection;
pub mod error;
pub mod lock;
pub mod packet;
pub mod subsystem;

// Async modules (require tokio feature)
#[cfg(feature = "tokio")]
pub mod codec_async;

// Re-export commonly used types at the crate root
pub use client::{BaseClient, ClientCallback, SyncTcpClient};
pub use codec::HEADER_LEN;
pub use connection::{ClientConfig, ConnectionState, ConnectionStats};
pub use error::{EngineError, ReceiveError, ReceiveStatus, Result};
pub use lock::{Lock, LockGuard, LockPolicy};
pub use packet::{Ownership, Packet, SharedPacket};
pub use subsystem::Subsystem;
