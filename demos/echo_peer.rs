//! Frame echo peer.
//!
//! Accepts connections and echoes back every length-prefixed frame it
//! receives.
//!
//! Run with: cargo run --example echo_peer
//! Then connect with: cargo run --example sync_client

use framelink::codec::{read_frame, write_frame};
use framelink::EngineError;
use std::io;
use std::net::TcpListener;
use std::thread;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const BIND_ADDR: &str = "127.0.0.1:8988";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let listener = TcpListener::bind(BIND_ADDR)?;
    info!(addr = %listener.local_addr()?, "echo peer listening");

    for connection in listener.incoming() {
        match connection {
            Ok(mut stream) => {
                let peer = stream.peer_addr()?;
                info!(%peer, "new connection");

                thread::spawn(move || {
                    loop {
                        match read_frame(&mut stream) {
                            Ok(payload) => {
                                info!(%peer, len = payload.len(), "frame received");
                                if let Err(e) = write_frame(&mut stream, &payload) {
                                    warn!(%peer, error = %e, "failed to echo frame");
                                    break;
                                }
                            }
                            Err(EngineError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                                break;
                            }
                            Err(e) => {
                                warn!(%peer, error = %e, "connection error");
                                break;
                            }
                        }
                    }
                    info!(%peer, "connection closed");
                });
            }
            Err(e) => error!(error = %e, "accept error"),
        }
    }

    Ok(())
}
