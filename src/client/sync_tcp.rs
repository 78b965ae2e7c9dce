//! Synchronous TCP client.

use std::fmt;
use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, info, warn};

use crate::codec::{decode_header, encode_frame, read_full, ReadOutcome, HEADER_LEN};
use crate::connection::{ClientConfig, ConnectionState, ConnectionStats};
use crate::error::{EngineError, ReceiveError, Result};
use crate::packet::Packet;
use crate::subsystem::Subsystem;

use super::base::{BaseClient, Link};
use super::ClientCallback;

/// Shortest wait handed to the socket; std rejects a zero timeout.
const MIN_WAIT: Duration = Duration::from_millis(1);

/// A blocking client speaking length-prefixed frames over TCP.
///
/// Every call runs on the calling thread. One sender and one receiver may
/// run concurrently; sends are serialized against each other and against
/// `disconnect`.
///
/// # Example
///
/// ```no_run
/// use framelink::{ClientConfig, Packet, SyncTcpClient};
///
/// let client = SyncTcpClient::new(ClientConfig::new("127.0.0.1", "9443"));
/// client.connect(None, None).unwrap();
///
/// client.send_framed(&Packet::owned(b"ping"), None).unwrap();
/// let reply = client.receive(None).unwrap();
/// println!("{} bytes", reply.len());
///
/// client.disconnect();
/// ```
pub struct SyncTcpClient {
    base: BaseClient,
}

impl SyncTcpClient {
    /// Create a disconnected client.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            base: BaseClient::new(config),
        }
    }

    /// Create a disconnected client with a disconnect callback.
    pub fn with_callback(callback: Arc<dyn ClientCallback>, config: ClientConfig) -> Self {
        let client = Self::new(config);
        client.base.set_callback_object(callback);
        client
    }

    /// Get the underlying endpoint state.
    pub fn base(&self) -> &BaseClient {
        &self.base
    }

    /// Set the host; see [`BaseClient::set_host_name`].
    pub fn set_host_name(&self, name: &str) -> bool {
        self.base.set_host_name(name)
    }

    /// Set the port; see [`BaseClient::set_port`].
    pub fn set_port(&self, port: &str) -> bool {
        self.base.set_port(port)
    }

    /// Get the configured host.
    pub fn host_name(&self) -> String {
        self.base.host_name()
    }

    /// Get the configured port.
    pub fn port(&self) -> String {
        self.base.port()
    }

    /// Register the disconnect callback.
    pub fn set_callback_object(&self, callback: Arc<dyn ClientCallback>) {
        self.base.set_callback_object(callback)
    }

    /// Get the registered disconnect callback.
    pub fn callback_object(&self) -> Option<Arc<dyn ClientCallback>> {
        self.base.callback_object()
    }

    /// Check if the connection is established. Never blocks.
    pub fn is_connection_alive(&self) -> bool {
        self.base.is_connection_alive()
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.base.state()
    }

    /// Get connection statistics.
    pub fn stats(&self) -> ConnectionStats {
        self.base.stats()
    }

    /// Address of the connected peer.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.base.peer_addr()
    }

    /// Set the wait used by [`recv`](Self::recv).
    pub fn set_wait_time(&self, wait: Option<Duration>) {
        self.base.set_wait_time(wait)
    }

    /// Get the wait used by [`recv`](Self::recv).
    pub fn wait_time(&self) -> Option<Duration> {
        self.base.wait_time()
    }

    /// Connect to the configured endpoint.
    ///
    /// `host` and `port` override the stored configuration when given. Does
    /// nothing if already connected. Every resolved address is tried in
    /// order until one accepts; nothing is retried after that.
    pub fn connect(&self, host: Option<&str>, port: Option<&str>) -> Result<()> {
        let _general = self.base.general_lock.lock();
        if self.base.is_connection_alive() {
            return Ok(());
        }

        let (host, port) = self.base.begin_connect(host, port);
        let config = self.base.config();
        let subsystem = Subsystem::global().acquire();

        let candidates = match resolve(&host, &port) {
            Ok(candidates) => candidates,
            Err(e) => return Err(self.fail_connect(e)),
        };

        let (stream, peer) = match connect_first(&candidates, config.connect_timeout) {
            Ok(Some(found)) => found,
            Ok(None) => {
                let attempts = candidates.len();
                return Err(self.fail_connect(EngineError::Unreachable {
                    host,
                    port,
                    attempts,
                }));
            }
            Err(e) => return Err(self.fail_connect(e)),
        };

        if config.nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                warn!(%peer, error = %e, "failed to set TCP_NODELAY");
            }
        }

        let session = self
            .base
            .install(Link::new(stream, peer, candidates, subsystem));
        info!(%peer, session, "connected");
        Ok(())
    }

    fn fail_connect(&self, err: EngineError) -> EngineError {
        warn!(error = %err, "connect failed");
        self.base.record(ConnectionStats::record_failure);
        self.base.clean_up_client();
        err
    }

    /// Disconnect from the peer.
    ///
    /// Signals the end of sending, closes the socket and wakes any receive
    /// blocked on it, then notifies the callback. Does nothing if already
    /// disconnected.
    pub fn disconnect(&self) {
        let ended = {
            let _general = self.base.general_lock.lock();
            self.end_session(None, true)
        };
        if ended {
            self.notify_disconnect();
        }
    }

    /// Tear down `session` after a failure on it.
    ///
    /// Returns `false` if the session had already ended.
    fn disconnect_session(&self, session: u64) -> bool {
        let ended = self.end_session(Some(session), false);
        if ended {
            self.notify_disconnect();
        }
        ended
    }

    fn end_session(&self, session: Option<u64>, graceful: bool) -> bool {
        let _send = self.base.send_lock.lock();
        let Some(link) = self.base.take_link(session) else {
            return false;
        };
        if graceful {
            if let Err(e) = link.stream.shutdown(Shutdown::Write) {
                warn!(session = link.session, error = %e, "shutdown failed");
            }
        }
        // Wakes a reader blocked on this socket.
        let _ = link.stream.shutdown(Shutdown::Read);
        info!(session = link.session, peer = %link.peer, graceful, "disconnected");
        self.base.release(link);
        true
    }

    fn notify_disconnect(&self) {
        match self.base.callback_object() {
            Some(callback) => callback.on_disconnect(self),
            None => debug!("no disconnect callback registered"),
        }
    }

    /// Write the packet's bytes verbatim.
    ///
    /// `wait` bounds the write (`None` blocks). Returns the number of bytes
    /// sent. A failed send ends the session.
    pub fn send(&self, packet: &Packet<'_>, wait: Option<Duration>) -> Result<usize> {
        let bytes = packet.bytes();
        self.write_bytes(&bytes, wait)
    }

    /// Write the packet as one frame: length header, then payload.
    ///
    /// Returns the number of bytes sent, header included.
    pub fn send_framed(&self, packet: &Packet<'_>, wait: Option<Duration>) -> Result<usize> {
        let frame = encode_frame(&packet.bytes())?;
        self.write_bytes(&frame, wait)
    }

    fn write_bytes(&self, bytes: &[u8], wait: Option<Duration>) -> Result<usize> {
        let (session, outcome) = {
            let _send = self.base.send_lock.lock();
            let Some((session, stream)) = self.base.current() else {
                return Err(EngineError::NotConnected);
            };
            let mut writer: &TcpStream = &stream;
            let outcome = stream
                .set_write_timeout(wait.map(clamp_wait))
                .and_then(|()| writer.write_all(bytes));
            (session, outcome)
        };

        match outcome {
            Ok(()) => {
                self.base.record(|stats| stats.record_send(bytes.len()));
                Ok(bytes.len())
            }
            Err(e) => {
                warn!(session, error = %e, "send failed");
                self.disconnect_session(session);
                match e.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                        Err(EngineError::Timeout)
                    }
                    _ => Err(e.into()),
                }
            }
        }
    }

    /// Receive one frame using the configured wait time.
    pub fn recv(&self) -> std::result::Result<Packet<'static>, ReceiveError> {
        self.receive(self.base.wait_time())
    }

    /// Receive one frame.
    ///
    /// Waits up to `wait` for data (`None` waits indefinitely), then reads
    /// the 4-byte length header and exactly that many payload bytes into a
    /// new owned packet. A timeout leaves the connection untouched; every
    /// other failure ends the session before returning.
    pub fn receive(
        &self,
        wait: Option<Duration>,
    ) -> std::result::Result<Packet<'static>, ReceiveError> {
        if !self.base.is_connection_alive() {
            return Err(ReceiveError::NotConnected);
        }
        let Some((session, stream)) = self.base.current() else {
            return Err(ReceiveError::NotConnected);
        };

        match wait_readable(&stream, wait) {
            Ok(true) => {}
            Ok(false) => return Err(ReceiveError::Timeout),
            Err(e) if is_reset(&e) => {
                let err = ReceiveError::ReceiveFailed {
                    expected: HEADER_LEN,
                    received: 0,
                    source: Some(e),
                };
                return Err(self.fail_receive(session, err));
            }
            Err(e) => return Err(self.fail_receive(session, ReceiveError::SocketError(e))),
        }
        if let Err(e) = stream.set_read_timeout(None) {
            return Err(self.fail_receive(session, ReceiveError::SocketError(e)));
        }

        let mut reader: &TcpStream = &stream;
        let mut header = [0u8; HEADER_LEN];
        if let Some(err) = classify_read(read_full(&mut reader, &mut header), HEADER_LEN) {
            return Err(self.fail_receive(session, err));
        }

        let len = decode_header(header) as usize;
        let max = self.base.max_packet_size();
        if len > max {
            return Err(self.fail_receive(session, ReceiveError::PacketTooLarge { size: len, max }));
        }

        let mut payload = vec![0u8; len];
        if let Some(err) = classify_read(read_full(&mut reader, &mut payload), len) {
            return Err(self.fail_receive(session, err));
        }

        self.base.record(|stats| stats.record_receive(len));
        debug!(session, len, "packet received");
        Ok(Packet::from_vec(payload).with_lock_policy(self.base.lock_policy()))
    }

    /// End `session` because of `err`.
    ///
    /// If another caller already ended the session the failure is a side
    /// effect of that and is reported as [`ReceiveError::Aborted`].
    fn fail_receive(&self, session: u64, err: ReceiveError) -> ReceiveError {
        if self.disconnect_session(session) {
            warn!(session, error = %err, "receive failed");
            err
        } else {
            debug!(session, error = %err, "receive interrupted by disconnect");
            ReceiveError::Aborted
        }
    }
}

impl Clone for SyncTcpClient {
    /// A new, disconnected client with the same configuration and callback.
    fn clone(&self) -> Self {
        let client = Self::new(self.base.config());
        if let Some(callback) = self.base.callback_object() {
            client.base.set_callback_object(callback);
        }
        client
    }
}

impl Drop for SyncTcpClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for SyncTcpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncTcpClient")
            .field("base", &self.base)
            .finish()
    }
}

fn resolve(host: &str, port: &str) -> Result<Vec<SocketAddr>> {
    let port_number: u16 = port
        .parse()
        .map_err(|_| EngineError::InvalidPort(port.to_owned()))?;
    let candidates: Vec<SocketAddr> = (host, port_number)
        .to_socket_addrs()
        .map_err(|source| EngineError::Resolve {
            host: host.to_owned(),
            port: port.to_owned(),
            source,
        })?
        .collect();
    if candidates.is_empty() {
        return Err(EngineError::NoAddress {
            host: host.to_owned(),
            port: port.to_owned(),
        });
    }
    Ok(candidates)
}

/// Try each candidate in order; `Ok(None)` when all of them refused.
fn connect_first(
    candidates: &[SocketAddr],
    timeout: Option<Duration>,
) -> Result<Option<(TcpStream, SocketAddr)>> {
    for (attempt, addr) in candidates.iter().enumerate() {
        let socket = Socket::new(Domain::for_address(*addr), Type::STREAM, Some(Protocol::TCP))?;
        let target = SockAddr::from(*addr);
        let connected = match timeout {
            Some(timeout) => socket.connect_timeout(&target, timeout),
            None => socket.connect(&target),
        };
        match connected {
            Ok(()) => return Ok(Some((socket.into(), *addr))),
            Err(e) => debug!(%addr, attempt = attempt + 1, error = %e, "connect attempt failed"),
        }
    }
    Ok(None)
}

/// Wait until `stream` is readable; `Ok(false)` on timeout.
///
/// End of stream counts as readable so the frame read can observe it.
fn wait_readable(stream: &TcpStream, wait: Option<Duration>) -> io::Result<bool> {
    stream.set_read_timeout(wait.map(clamp_wait))?;
    let mut probe = [0u8; 1];
    loop {
        match stream.peek(&mut probe) {
            Ok(_) => return Ok(true),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Ok(false);
            }
            Err(e) => return Err(e),
        }
    }
}

/// A reset peer makes the socket readable; the failure belongs to the read.
fn is_reset(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
    )
}

fn classify_read(outcome: ReadOutcome, expected: usize) -> Option<ReceiveError> {
    match outcome {
        ReadOutcome::Complete => None,
        ReadOutcome::Closed => Some(ReceiveError::ConnectionClosing),
        ReadOutcome::Short { received } => Some(ReceiveError::ReceiveFailed {
            expected,
            received,
            source: None,
        }),
        ReadOutcome::Failed { received, error } => Some(ReceiveError::ReceiveFailed {
            expected,
            received,
            source: Some(error),
        }),
    }
}

fn clamp_wait(wait: Duration) -> Duration {
    wait.max(MIN_WAIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{read_frame, write_frame, FrameReader};
    use crate::lock::LockPolicy;
    use std::io::Read;
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread::{self, JoinHandle};

    /// Accept one connection on a loopback port and hand it to `serve`.
    fn peer<F>(serve: F) -> (String, JoinHandle<()>)
    where
        F: FnOnce(TcpStream) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port().to_string();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            serve(stream);
        });
        (port, handle)
    }

    fn counting_callback() -> (Arc<AtomicUsize>, Arc<dyn ClientCallback>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let callback: Arc<dyn ClientCallback> = Arc::new(move |_client: &SyncTcpClient| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    fn client_for(port: &str) -> SyncTcpClient {
        SyncTcpClient::new(ClientConfig::new("127.0.0.1", port))
    }

    #[test]
    fn test_receive_hello() {
        for policy in [LockPolicy::Mutex, LockPolicy::Reentrant, LockPolicy::None] {
            let (port, server) = peer(|mut stream| {
                stream.write_all(b"\x05\x00\x00\x00hello").unwrap();
            });

            let client = SyncTcpClient::new(
                ClientConfig::new("127.0.0.1", &port).with_lock_policy(policy),
            );
            client.connect(None, None).unwrap();
            assert!(client.is_connection_alive());

            let packet = client.receive(None).unwrap();
            assert_eq!(packet.len(), 5);
            assert_eq!(&*packet.bytes(), b"hello");
            assert!(packet.is_owned());
            assert_eq!(packet.lock_policy(), policy);

            server.join().unwrap();
        }
    }

    #[test]
    fn test_zero_length_frame() {
        let (port, server) = peer(|mut stream| {
            stream.write_all(&[0, 0, 0, 0]).unwrap();
            write_frame(&mut stream, b"next").unwrap();
        });

        let client = client_for(&port);
        client.connect(None, None).unwrap();

        let empty = client.receive(Some(Duration::from_secs(5))).unwrap();
        assert!(empty.is_empty());
        assert!(client.is_connection_alive());

        let next = client.receive(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(&*next.bytes(), b"next");
        server.join().unwrap();
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let (port, server) = peer(move |_stream| {
            let _ = done_rx.recv();
        });

        let (count, callback) = counting_callback();
        let client = SyncTcpClient::with_callback(callback, ClientConfig::new("127.0.0.1", &port));
        client.connect(None, None).unwrap();

        client.disconnect();
        client.disconnect();
        assert!(!client.is_connection_alive());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(client.stats().disconnect_count, 1);

        drop(done_tx);
        server.join().unwrap();
    }

    #[test]
    fn test_timeout_keeps_connection() {
        let (go_tx, go_rx) = mpsc::channel::<()>();
        let (port, server) = peer(move |mut stream| {
            go_rx.recv().unwrap();
            write_frame(&mut stream, b"late").unwrap();
        });

        let client = client_for(&port);
        client.connect(None, None).unwrap();

        let result = client.receive(Some(Duration::from_millis(50)));
        assert!(matches!(result, Err(ReceiveError::Timeout)));
        assert!(client.is_connection_alive());

        go_tx.send(()).unwrap();
        let packet = client.receive(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(&*packet.bytes(), b"late");
        server.join().unwrap();
    }

    #[test]
    fn test_peer_close_is_connection_closing() {
        let (port, server) = peer(drop);

        let (count, callback) = counting_callback();
        let client = SyncTcpClient::with_callback(callback, ClientConfig::new("127.0.0.1", &port));
        client.connect(None, None).unwrap();
        server.join().unwrap();

        let result = client.receive(Some(Duration::from_millis(1000)));
        assert!(matches!(result, Err(ReceiveError::ConnectionClosing)));
        assert!(!client.is_connection_alive());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let again = client.receive(Some(Duration::from_millis(10)));
        assert!(matches!(again, Err(ReceiveError::NotConnected)));
    }

    #[test]
    fn test_peer_close_mid_payload() {
        let (port, server) = peer(|mut stream| {
            stream.write_all(&[10, 0, 0, 0]).unwrap();
            stream.write_all(b"abc").unwrap();
        });

        let client = client_for(&port);
        client.connect(None, None).unwrap();
        server.join().unwrap();

        match client.receive(Some(Duration::from_secs(5))) {
            Err(ReceiveError::ReceiveFailed {
                expected, received, ..
            }) => {
                assert_eq!(expected, 10);
                assert_eq!(received, 3);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!client.is_connection_alive());
    }

    #[test]
    fn test_oversized_frame_ends_session() {
        let (port, server) = peer(|mut stream| {
            stream.write_all(&[5, 0, 0, 0]).unwrap();
            let _ = stream.read(&mut [0u8; 1]);
        });

        let client = SyncTcpClient::new(
            ClientConfig::new("127.0.0.1", &port).with_max_packet_size(4),
        );
        client.connect(None, None).unwrap();

        let result = client.receive(None);
        assert!(matches!(
            result,
            Err(ReceiveError::PacketTooLarge { size: 5, max: 4 })
        ));
        assert!(!client.is_connection_alive());
        server.join().unwrap();
    }

    #[test]
    fn test_not_connected() {
        let client = client_for("9");
        assert!(matches!(
            client.receive(Some(Duration::from_millis(10))),
            Err(ReceiveError::NotConnected)
        ));
        assert!(matches!(
            client.send(&Packet::owned(b"x"), None),
            Err(EngineError::NotConnected)
        ));
        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port().to_string();
        drop(listener);

        let client = client_for(&port);
        let err = client.connect(None, None).unwrap_err();
        assert!(matches!(err, EngineError::Unreachable { attempts: 1, .. }));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.base().resolved_addrs().is_empty());
        assert_eq!(client.stats().failure_count, 1);
    }

    #[test]
    fn test_invalid_port() {
        let client = client_for("not-a-port");
        let err = client.connect(None, None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPort(ref p) if p == "not-a-port"));
        assert!(!client.is_connection_alive());
    }

    #[test]
    fn test_connect_arguments_override_config() {
        let (port, server) = peer(|mut stream| {
            write_frame(&mut stream, b"override").unwrap();
        });

        let client = client_for("1");
        client.connect(Some("127.0.0.1"), Some(port.as_str())).unwrap();
        assert_eq!(client.port(), port);
        assert!(client.connect(None, Some("1")).is_ok());
        assert_eq!(client.port(), port);

        let packet = client.receive(None).unwrap();
        assert_eq!(&*packet.bytes(), b"override");
        server.join().unwrap();
    }

    #[test]
    fn test_configuration_locked_while_connected() {
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let (port, server) = peer(move |_stream| {
            let _ = done_rx.recv();
        });

        let client = client_for(&port);
        client.connect(None, None).unwrap();
        assert!(!client.set_host_name("example.org"));
        assert!(!client.set_port("1"));
        assert_eq!(client.host_name(), "127.0.0.1");
        assert_eq!(client.port(), port);
        assert!(client.peer_addr().is_some());
        assert!(!client.base().resolved_addrs().is_empty());
        assert!(Subsystem::global().is_initialized());

        client.disconnect();
        assert!(client.set_port("1"));
        drop(done_tx);
        server.join().unwrap();
    }

    #[test]
    fn test_send_round_trip() {
        let (port, server) = peer(|mut stream| {
            let mut raw = [0u8; 3];
            stream.read_exact(&mut raw).unwrap();
            assert_eq!(&raw, b"raw");

            let payload = read_frame(&mut stream).unwrap();
            write_frame(&mut stream, &payload).unwrap();
        });

        let client = client_for(&port);
        client.connect(None, None).unwrap();

        assert_eq!(client.send(&Packet::owned(b"raw"), None).unwrap(), 3);
        let source = b"echo me".to_vec();
        let sent = client
            .send_framed(&Packet::view(&source), Some(Duration::from_secs(5)))
            .unwrap();
        assert_eq!(sent, HEADER_LEN + source.len());

        let reply = client.receive(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(reply.to_vec(), source);

        let stats = client.stats();
        assert_eq!(stats.messages_sent, 2);
        assert_eq!(stats.messages_received, 1);
        server.join().unwrap();
    }

    #[test]
    fn test_concurrent_senders_do_not_interleave() {
        const FRAMES: usize = 200;
        let (port, server) = peer(|mut stream| {
            let mut reader = FrameReader::new();
            let mut seen = 0;
            let mut buf = [0u8; 4096];
            while seen < 2 * FRAMES {
                let n = stream.read(&mut buf).unwrap();
                assert!(n > 0, "client closed early");
                reader.feed(&buf[..n]);
                for frame in reader.parse_all().unwrap() {
                    assert_eq!(frame.len(), 512);
                    assert!(frame.iter().all(|b| *b == frame[0]));
                    seen += 1;
                }
            }
        });

        let client = client_for(&port);
        client.connect(None, None).unwrap();

        thread::scope(|scope| {
            for fill in [b'a', b'b'] {
                let client = &client;
                scope.spawn(move || {
                    let packet = Packet::owned(&[fill; 512]);
                    for _ in 0..FRAMES {
                        client.send_framed(&packet, None).unwrap();
                    }
                });
            }
        });

        server.join().unwrap();
    }

    #[test]
    fn test_disconnect_unblocks_receive() {
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let (port, server) = peer(move |_stream| {
            let _ = done_rx.recv();
        });

        let (count, callback) = counting_callback();
        let client = SyncTcpClient::with_callback(callback, ClientConfig::new("127.0.0.1", &port));
        client.connect(None, None).unwrap();

        let result = thread::scope(|scope| {
            let receiver = scope.spawn(|| client.receive(None));
            thread::sleep(Duration::from_millis(200));
            client.disconnect();
            receiver.join().unwrap()
        });

        assert!(matches!(
            result,
            Err(ReceiveError::Aborted | ReceiveError::NotConnected)
        ));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        drop(done_tx);
        server.join().unwrap();
    }

    #[test]
    fn test_reconnect_after_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port().to_string();
        let server = thread::spawn(move || {
            for round in 0u8..2 {
                let (mut stream, _) = listener.accept().unwrap();
                write_frame(&mut stream, &[round]).unwrap();
                let _ = stream.read(&mut [0u8; 1]);
            }
        });

        let (count, callback) = counting_callback();
        let client = SyncTcpClient::with_callback(callback, ClientConfig::new("127.0.0.1", &port));
        for round in 0u8..2 {
            client.connect(None, None).unwrap();
            let packet = client.receive(Some(Duration::from_secs(5))).unwrap();
            assert_eq!(&*packet.bytes(), &[round]);
            client.disconnect();
        }

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(client.stats().connect_count, 2);
        server.join().unwrap();
    }

    #[test]
    fn test_drop_disconnects() {
        let (port, server) = peer(|mut stream| {
            let mut buf = [0u8; 1];
            assert_eq!(stream.read(&mut buf).unwrap(), 0);
        });

        let (count, callback) = counting_callback();
        let client = SyncTcpClient::with_callback(callback, ClientConfig::new("127.0.0.1", &port));
        client.connect(None, None).unwrap();
        drop(client);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        server.join().unwrap();
    }

    #[test]
    fn test_clone_copies_configuration() {
        let (count, callback) = counting_callback();
        let client = SyncTcpClient::with_callback(
            callback,
            ClientConfig::new("127.0.0.1", "9443").with_lock_policy(LockPolicy::Reentrant),
        );
        let copy = client.clone();

        assert_eq!(copy.host_name(), "127.0.0.1");
        assert_eq!(copy.port(), "9443");
        assert_eq!(copy.base().lock_policy(), LockPolicy::Reentrant);
        assert!(copy.callback_object().is_some());
        assert!(!copy.is_connection_alive());

        drop(copy);
        drop(client);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_recv_uses_configured_wait() {
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let (port, server) = peer(move |_stream| {
            let _ = done_rx.recv();
        });

        let client = SyncTcpClient::new(
            ClientConfig::new("127.0.0.1", &port).with_wait_time(Duration::from_millis(20)),
        );
        client.connect(None, None).unwrap();
        assert!(matches!(client.recv(), Err(ReceiveError::Timeout)));

        client.set_wait_time(Some(Duration::ZERO));
        assert!(matches!(client.recv(), Err(ReceiveError::Timeout)));

        drop(done_tx);
        server.join().unwrap();
    }

    #[test]
    fn test_peer_reset_is_receive_failed() {
        let (port, server) = peer(|stream| {
            socket2::SockRef::from(&stream)
                .set_linger(Some(Duration::ZERO))
                .unwrap();
        });

        let (count, callback) = counting_callback();
        let client = SyncTcpClient::with_callback(callback, ClientConfig::new("127.0.0.1", &port));
        client.connect(None, None).unwrap();
        server.join().unwrap();

        let result = client.receive(Some(Duration::from_secs(5)));
        assert!(
            matches!(result, Err(ReceiveError::ReceiveFailed { received: 0, .. })),
            "unexpected result: {result:?}"
        );
        assert!(!client.is_connection_alive());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_echo_varied_sizes() {
        const SIZES: [usize; 6] = [1, 7, 1500, 65_536, 300_000, 1 << 20];
        let (port, server) = peer(|mut stream| {
            for _ in SIZES {
                let payload = read_frame(&mut stream).unwrap();
                write_frame(&mut stream, &payload).unwrap();
            }
        });

        let client = client_for(&port);
        client.connect(None, None).unwrap();

        for size in SIZES {
            let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            client
                .send_framed(&Packet::owned(&payload), Some(Duration::from_secs(10)))
                .unwrap();
            let reply = client.receive(Some(Duration::from_secs(10))).unwrap();
            assert_eq!(reply.len(), size);
            assert!(*reply.bytes() == payload[..], "payload mismatch for {size} bytes");
        }

        assert_eq!(client.stats().bytes_received, SIZES.iter().sum::<usize>() as u64);
        server.join().unwrap();
    }

    #[test]
    fn test_every_ended_session_notifies() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port().to_string();

        let (count, callback) = counting_callback();
        let client = SyncTcpClient::with_callback(callback, ClientConfig::new("127.0.0.1", "bad"));
        assert!(client.connect(None, None).is_err());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        assert_eq!(client.stats().failure_count, 1);

        for round in 1..=2 {
            client.connect(None, Some(port.as_str())).unwrap();
            let (_accepted, _) = listener.accept().unwrap();
            client.disconnect();
            client.disconnect();
            assert!(!client.is_connection_alive());
            assert_eq!(count.load(Ordering::SeqCst), round);
        }
        assert_eq!(client.stats().disconnect_count, 2);
    }
}
