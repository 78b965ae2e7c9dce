//! Disconnect notification.

use super::SyncTcpClient;

/// Receives disconnect notifications from a client.
///
/// `on_disconnect` runs synchronously on the thread that ended the session
/// (the caller of `disconnect`, or the sender/receiver that hit the
/// failure), exactly once per session, after the socket is torn down and
/// with no client lock held.
pub trait ClientCallback: Send + Sync {
    fn on_disconnect(&self, client: &SyncTcpClient);
}

impl<F> ClientCallback for F
where
    F: Fn(&SyncTcpClient) + Send + Sync,
{
    fn on_disconnect(&self, client: &SyncTcpClient) {
        self(client)
    }
}
