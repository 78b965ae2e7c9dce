//! Client configuration, connection state and statistics.
//!
//! # Example
//!
//! ```
//! use framelink::connection::{ClientConfig, DEFAULT_PORT};
//! use framelink::LockPolicy;
//! use std::time::Duration;
//!
//! let config = ClientConfig::new("127.0.0.1", "")
//!     .with_lock_policy(LockPolicy::Reentrant)
//!     .with_wait_time(Duration::from_millis(500));
//!
//! assert_eq!(config.port, DEFAULT_PORT);
//! ```

pub(crate) mod config;
mod state;

pub use config::{ClientConfig, DEFAULT_HOSTNAME, DEFAULT_MAX_PACKET_SIZE, DEFAULT_PORT};
pub use state::{ConnectionState, ConnectionStats};
