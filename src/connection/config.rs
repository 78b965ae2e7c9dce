//! Client configuration.

use std::time::Duration;

use crate::lock::LockPolicy;

/// Host used when none (or an empty one) is configured.
pub const DEFAULT_HOSTNAME: &str = "localhost";

/// Port used when none (or an empty one) is configured.
pub const DEFAULT_PORT: &str = "8988";

/// Largest payload accepted by default on the receive path (64 MiB).
pub const DEFAULT_MAX_PACKET_SIZE: usize = 64 * 1024 * 1024;

/// Client configuration.
///
/// Wait times use `None` for "wait indefinitely".
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host name or address to connect to.
    pub host: String,
    /// Numeric TCP port, as text.
    pub port: String,
    /// Primitive backing every lock of the client.
    pub lock_policy: LockPolicy,
    /// Default wait for receives without an explicit wait time.
    pub wait_time: Option<Duration>,
    /// Bound on each connect attempt.
    pub connect_timeout: Option<Duration>,
    /// Disable Nagle's algorithm on connected sockets.
    pub nodelay: bool,
    /// Largest payload length accepted from a frame header.
    pub max_packet_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOSTNAME.to_owned(),
            port: DEFAULT_PORT.to_owned(),
            lock_policy: LockPolicy::default(),
            wait_time: None,
            connect_timeout: None,
            nodelay: true,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the given endpoint.
    ///
    /// Empty strings fall back to [`DEFAULT_HOSTNAME`] and [`DEFAULT_PORT`].
    pub fn new(host: &str, port: &str) -> Self {
        Self::default().with_host(host).with_port(port)
    }

    /// Configuration for single-threaded use: no locking.
    pub fn single_threaded() -> Self {
        Self::default().with_lock_policy(LockPolicy::None)
    }

    /// Set the host.
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host_or_default(host);
        self
    }

    /// Set the port.
    pub fn with_port(mut self, port: &str) -> Self {
        self.port = port_or_default(port);
        self
    }

    /// Set the lock policy.
    pub fn with_lock_policy(mut self, policy: LockPolicy) -> Self {
        self.lock_policy = policy;
        self
    }

    /// Set the default receive wait.
    pub fn with_wait_time(mut self, wait: Duration) -> Self {
        self.wait_time = Some(wait);
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Enable or disable `TCP_NODELAY`.
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Set the maximum accepted payload length.
    pub fn with_max_packet_size(mut self, max: usize) -> Self {
        self.max_packet_size = max;
        self
    }
}

pub(crate) fn host_or_default(host: &str) -> String {
    if host.is_empty() {
        DEFAULT_HOSTNAME.to_owned()
    } else {
        host.to_owned()
    }
}

pub(crate) fn port_or_default(port: &str) -> String {
    if port.is_empty() {
        DEFAULT_PORT.to_owned()
    } else {
        port.to_owned()
    }
}
