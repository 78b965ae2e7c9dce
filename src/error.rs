//! Error types for client operations.

use std::io;
use thiserror::Error;

/// Errors that can occur while configuring, connecting or sending.
#[derive(Error, Debug)]
pub enum EngineError {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Port string is not a valid TCP port number.
    #[error("Invalid port: {0:?}")]
    InvalidPort(String),

    /// Address resolution failed.
    #[error("Failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: String,
        #[source]
        source: io::Error,
    },

    /// Address resolution succeeded but yielded no candidates.
    #[error("No address found for {host}:{port}")]
    NoAddress { host: String, port: String },

    /// Every resolved candidate refused the connection.
    #[error("Unable to connect to {host}:{port} after {attempts} attempt(s)")]
    Unreachable {
        host: String,
        port: String,
        attempts: usize,
    },

    /// Operation requires a live connection.
    #[error("Not connected")]
    NotConnected,

    /// Operation timed out.
    #[error("Operation timed out")]
    Timeout,

    /// Packet does not fit in a frame.
    #[error("Packet too large: {size} bytes exceeds maximum of {max} bytes")]
    PacketTooLarge { size: usize, max: usize },

    /// A view packet was asked to allocate storage.
    #[error("Packet borrows its storage and cannot allocate")]
    BorrowedStorage,

    /// Receive-path failure.
    #[error(transparent)]
    Receive(#[from] ReceiveError),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Check if this error is recoverable (transient).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
            ),
            Self::Timeout => true,
            Self::Receive(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Failure outcomes of [`SyncTcpClient::receive`](crate::SyncTcpClient::receive).
#[derive(Error, Debug)]
pub enum ReceiveError {
    /// The client was not connected when the receive started.
    #[error("Not connected")]
    NotConnected,

    /// No data became readable within the wait time.
    #[error("Receive timed out")]
    Timeout,

    /// The readiness wait itself failed.
    #[error("Socket error while waiting for data: {0}")]
    SocketError(#[source] io::Error),

    /// The peer closed the connection.
    #[error("Connection closing")]
    ConnectionClosing,

    /// Short read or read error inside a frame.
    #[error("Receive failed: expected {expected} bytes, got {received}")]
    ReceiveFailed {
        expected: usize,
        received: usize,
        #[source]
        source: Option<io::Error>,
    },

    /// The frame header announced more bytes than the configured maximum.
    #[error("Packet too large: {size} bytes exceeds maximum of {max} bytes")]
    PacketTooLarge { size: usize, max: usize },

    /// The session was torn down by another caller while this receive was in flight.
    #[error("Receive aborted by disconnect")]
    Aborted,
}

impl ReceiveError {
    /// Only a timeout leaves the connection usable for another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Check if the failure ended the session.
    pub fn tears_down(&self) -> bool {
        !matches!(self, Self::NotConnected | Self::Timeout)
    }

    /// The status code matching this failure.
    pub fn status(&self) -> ReceiveStatus {
        match self {
            Self::NotConnected => ReceiveStatus::NotConnected,
            Self::Timeout => ReceiveStatus::Timeout,
            Self::SocketError(_) => ReceiveStatus::SocketError,
            Self::ConnectionClosing => ReceiveStatus::ConnectionClosing,
            Self::ReceiveFailed { .. } => ReceiveStatus::ReceiveFailed,
            Self::PacketTooLarge { .. } => ReceiveStatus::PacketTooLarge,
            Self::Aborted => ReceiveStatus::Aborted,
        }
    }
}

/// Flat status view of a receive outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiveStatus {
    Success,
    NotConnected,
    Timeout,
    SocketError,
    ConnectionClosing,
    ReceiveFailed,
    PacketTooLarge,
    Aborted,
}

impl ReceiveStatus {
    /// Classify a receive result.
    pub fn of<T>(result: &std::result::Result<T, ReceiveError>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(e) => e.status(),
        }
    }
}
