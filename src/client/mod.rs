//! Client endpoints.
//!
//! [`BaseClient`] holds the endpoint configuration, the locks and the live
//! socket. [`SyncTcpClient`] drives connect, send and receive on top of it
//! and reports disconnects through a [`ClientCallback`].

mod base;
mod callback;
mod sync_tcp;

pub use base::BaseClient;
pub use callback::ClientCallback;
pub use sync_tcp::SyncTcpClient;
