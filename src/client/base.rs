//! Connection endpoint state shared by every call path of a client.

use std::fmt;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::connection::config::{host_or_default, port_or_default};
use crate::connection::{ClientConfig, ConnectionState, ConnectionStats};
use crate::lock::{Lock, LockPolicy};
use crate::subsystem::SubsystemGuard;

use super::ClientCallback;

/// A live connection: the socket plus everything acquired to open it.
///
/// Dropping a link closes the socket (once no reader still holds the
/// stream), frees the resolved addresses and releases the subsystem.
pub(crate) struct Link {
    pub(crate) session: u64,
    pub(crate) stream: Arc<TcpStream>,
    pub(crate) peer: SocketAddr,
    pub(crate) resolved: Vec<SocketAddr>,
    _subsystem: SubsystemGuard<'static>,
}

impl Link {
    pub(crate) fn new(
        stream: TcpStream,
        peer: SocketAddr,
        resolved: Vec<SocketAddr>,
        subsystem: SubsystemGuard<'static>,
    ) -> Self {
        Self {
            session: 0,
            stream: Arc::new(stream),
            peer,
            resolved,
            _subsystem: subsystem,
        }
    }
}

/// Configuration, socket handle and locks of a client.
///
/// The send-lock serializes writes to the socket. The general-lock
/// serializes configuration changes, connect and disconnect.
///
/// Sessions can only be ended through the owning client:
///
/// ```compile_fail
/// use framelink::{ClientConfig, SyncTcpClient};
///
/// let client = SyncTcpClient::new(ClientConfig::default());
/// client.base().clean_up_client();
/// ```
pub struct BaseClient {
    config: Mutex<ClientConfig>,
    callback: RwLock<Option<Arc<dyn ClientCallback>>>,
    link: Mutex<Option<Link>>,
    state: AtomicU8,
    next_session: AtomicU64,
    stats: Mutex<ConnectionStats>,
    pub(crate) send_lock: Box<dyn Lock>,
    pub(crate) general_lock: Box<dyn Lock>,
}

impl BaseClient {
    /// Create a disconnected endpoint.
    pub fn new(mut config: ClientConfig) -> Self {
        config.host = host_or_default(&config.host);
        config.port = port_or_default(&config.port);
        let policy = config.lock_policy;
        Self {
            config: Mutex::new(config),
            callback: RwLock::new(None),
            link: Mutex::new(None),
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            next_session: AtomicU64::new(1),
            stats: Mutex::new(ConnectionStats::default()),
            send_lock: policy.create_lock(),
            general_lock: policy.create_lock(),
        }
    }

    /// Set the host to connect to.
    ///
    /// An empty name selects the default host. Returns `false`, leaving the
    /// host unchanged, while connected.
    pub fn set_host_name(&self, name: &str) -> bool {
        let _general = self.general_lock.lock();
        if self.is_connection_alive() {
            warn!(host = name, "host cannot change while connected");
            return false;
        }
        self.config.lock().host = host_or_default(name);
        true
    }

    /// Set the port to connect to.
    ///
    /// An empty value selects the default port. Returns `false`, leaving the
    /// port unchanged, while connected.
    pub fn set_port(&self, port: &str) -> bool {
        let _general = self.general_lock.lock();
        if self.is_connection_alive() {
            warn!(port, "port cannot change while connected");
            return false;
        }
        self.config.lock().port = port_or_default(port);
        true
    }

    /// Get the configured host.
    pub fn host_name(&self) -> String {
        let _general = self.general_lock.lock();
        self.config.lock().host.clone()
    }

    /// Get the configured port.
    pub fn port(&self) -> String {
        let _general = self.general_lock.lock();
        self.config.lock().port.clone()
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> ClientConfig {
        self.config.lock().clone()
    }

    /// Set the default receive wait (`None` waits indefinitely).
    pub fn set_wait_time(&self, wait: Option<Duration>) {
        self.config.lock().wait_time = wait;
    }

    /// Get the default receive wait.
    pub fn wait_time(&self) -> Option<Duration> {
        self.config.lock().wait_time
    }

    pub(crate) fn max_packet_size(&self) -> usize {
        self.config.lock().max_packet_size
    }

    /// Register the disconnect callback, replacing any previous one.
    pub fn set_callback_object(&self, callback: Arc<dyn ClientCallback>) {
        *self.callback.write() = Some(callback);
    }

    /// Get the registered disconnect callback.
    pub fn callback_object(&self) -> Option<Arc<dyn ClientCallback>> {
        self.callback.read().clone()
    }

    /// Check if the connection is established. Never blocks.
    pub fn is_connection_alive(&self) -> bool {
        self.state().is_connected()
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// The policy every lock of this client was built from.
    pub fn lock_policy(&self) -> LockPolicy {
        self.general_lock.policy()
    }

    /// Get connection statistics.
    pub fn stats(&self) -> ConnectionStats {
        self.stats.lock().clone()
    }

    /// Address of the connected peer.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.link.lock().as_ref().map(|link| link.peer)
    }

    /// Addresses resolved for the current connection; empty when disconnected.
    pub fn resolved_addrs(&self) -> Vec<SocketAddr> {
        self.link
            .lock()
            .as_ref()
            .map(|link| link.resolved.clone())
            .unwrap_or_default()
    }

    /// Close the socket and release everything the last connect acquired.
    ///
    /// Safe to call any number of times. Only used on a failed connect,
    /// before a session exists; ending a session goes through
    /// [`SyncTcpClient::disconnect`](super::SyncTcpClient::disconnect) so
    /// the callback fires.
    pub(crate) fn clean_up_client(&self) {
        let link = {
            let mut slot = self.link.lock();
            self.set_state(ConnectionState::Disconnected);
            slot.take()
        };
        if let Some(link) = link {
            self.release(link);
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn record(&self, update: impl FnOnce(&mut ConnectionStats)) {
        let mut stats = self.stats.lock();
        update(&mut *stats);
    }

    /// Apply connect-time overrides and mark the connect as in flight.
    ///
    /// The caller holds the general-lock.
    pub(crate) fn begin_connect(&self, host: Option<&str>, port: Option<&str>) -> (String, String) {
        let endpoint = {
            let mut config = self.config.lock();
            if let Some(host) = host {
                config.host = host_or_default(host);
            }
            if let Some(port) = port {
                config.port = port_or_default(port);
            }
            (config.host.clone(), config.port.clone())
        };
        let _slot = self.link.lock();
        self.set_state(ConnectionState::Connecting);
        endpoint
    }

    /// Store a freshly connected link and return its session id.
    pub(crate) fn install(&self, mut link: Link) -> u64 {
        let session = self.next_session.fetch_add(1, Ordering::Relaxed);
        link.session = session;
        {
            let mut slot = self.link.lock();
            *slot = Some(link);
            self.set_state(ConnectionState::Connected);
        }
        self.record(ConnectionStats::record_connect);
        session
    }

    /// The live session and a handle to its stream.
    pub(crate) fn current(&self) -> Option<(u64, Arc<TcpStream>)> {
        self.link
            .lock()
            .as_ref()
            .map(|link| (link.session, Arc::clone(&link.stream)))
    }

    /// Detach the live link, if it belongs to `session` (any link for `None`).
    pub(crate) fn take_link(&self, session: Option<u64>) -> Option<Link> {
        let mut slot = self.link.lock();
        let owned = match (slot.as_ref(), session) {
            (Some(link), Some(id)) => link.session == id,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !owned {
            return None;
        }
        self.set_state(ConnectionState::Disconnected);
        slot.take()
    }

    pub(crate) fn release(&self, link: Link) {
        debug!(session = link.session, peer = %link.peer, "socket closed");
        self.record(ConnectionStats::record_disconnect);
        drop(link);
    }
}

impl fmt::Debug for BaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.config.lock();
        f.debug_struct("BaseClient")
            .field("host", &config.host)
            .field("port", &config.port)
            .field("state", &self.state())
            .field("lock_policy", &config.lock_policy)
            .finish()
    }
}
