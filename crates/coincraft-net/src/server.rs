//! Loopback WebSocket broadcast relay.
//!
//! Every text frame received from any connection is relayed to all
//! connections, the sender included; the dedup rule downstream makes
//! self-delivery harmless. Delivery is best-effort with no
//! acknowledgement, and a connection error only tears down that one
//! connection.

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Fan-out buffer per connection; a lagging client skips old signals
/// rather than stalling the relay.
const RELAY_BUFFER_SIZE: usize = 64;

/// Bind `addr` and spawn the relay as a background task.
///
/// Returns the actual bound address (useful when `addr` carries port 0)
/// and the task handle. A bind failure is returned to the caller, who
/// typically swallows it: another instance already serves this host.
pub async fn spawn(addr: &str) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "notification relay listening");

    let (relay_tx, _) = broadcast::channel(RELAY_BUFFER_SIZE);
    let handle = tokio::spawn(accept_loop(listener, relay_tx));
    Ok((local_addr, handle))
}

async fn accept_loop(listener: TcpListener, relay_tx: broadcast::Sender<String>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "relay accept failed");
                continue;
            }
        };
        let relay_tx = relay_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, relay_tx).await {
                debug!(peer = %peer, error = %e, "relay connection closed with error");
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    relay_tx: broadcast::Sender<String>,
) -> anyhow::Result<()> {
    let ws = accept_async(stream).await?;
    let (mut write, mut read) = ws.split();
    let mut relay_rx = relay_tx.subscribe();

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    // No subscribers is fine; send only fails then.
                    let _ = relay_tx.send(text);
                }
                Some(Ok(Message::Ping(data))) => {
                    write.send(Message::Pong(data)).await?;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            payload = relay_rx.recv() => match payload {
                Ok(text) => write.send(Message::Text(text)).await?,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "relay client lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}
