//! Synchronous client example.
//!
//! Connects to the echo peer, sends a few frames and prints the replies.
//!
//! Run the peer first: cargo run --example echo_peer
//! Then run: cargo run --example sync_client [host] [port]

use framelink::{ClientConfig, Packet, ReceiveStatus, SyncTcpClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_default();
    let port = args.next().unwrap_or_default();

    let config = ClientConfig::new(&host, &port)
        .with_wait_time(Duration::from_secs(2))
        .with_connect_timeout(Duration::from_secs(5));
    let client = SyncTcpClient::with_callback(
        Arc::new(|client: &SyncTcpClient| {
            info!(host = %client.host_name(), "disconnected from peer");
        }),
        config,
    );

    client.connect(None, None)?;
    info!(peer = ?client.peer_addr(), "connected");

    for message in ["hello", "from", "framelink"] {
        let sent = client.send_framed(&Packet::owned(message.as_bytes()), None)?;
        info!(message, sent, "frame sent");

        let reply = client.recv();
        match ReceiveStatus::of(&reply) {
            ReceiveStatus::Success => {
                if let Ok(packet) = reply {
                    info!(reply = %String::from_utf8_lossy(&packet.bytes()), "reply received");
                }
            }
            status => {
                info!(?status, "receive did not complete");
                break;
            }
        }
    }

    let stats = client.stats();
    info!(
        sent = stats.messages_sent,
        received = stats.messages_received,
        "session finished"
    );
    client.disconnect();
    Ok(())
}
