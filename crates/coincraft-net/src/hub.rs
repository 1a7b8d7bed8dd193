//! Notification hub transport state.
//!
//! Wraps the relay client (and, on the serving instance, the relay
//! itself) behind a handle whose operations never fail the caller: a
//! broken socket only degrades delivery to the polling fallback, and
//! the next `send` retries the connection.

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use futures::{SinkExt, StreamExt};
use tracing::{debug, info};

use crate::config::HubConfig;
use crate::server;
use crate::signal::ChangeSignal;

/// Buffered outgoing signals while the write half is busy.
const OUTGOING_BUFFER_SIZE: usize = 32;

/// Buffered incoming payloads awaiting dispatch.
const INCOMING_BUFFER_SIZE: usize = 64;

/// Handle to the push transport.
///
/// Created once per process and shared; the paired receiver surfaces
/// every raw payload the relay delivers (the dispatcher consumes it).
pub struct NotificationHub {
    config: HubConfig,
    incoming_tx: mpsc::Sender<String>,
    outgoing: Mutex<Option<mpsc::Sender<String>>>,
    server: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationHub {
    /// Build the hub and hand back the stream of incoming payloads.
    pub fn new(config: HubConfig) -> (Self, mpsc::Receiver<String>) {
        let (incoming_tx, incoming_rx) = mpsc::channel(INCOMING_BUFFER_SIZE);
        (
            Self {
                config,
                incoming_tx,
                outgoing: Mutex::new(None),
                server: Mutex::new(None),
            },
            incoming_rx,
        )
    }

    /// Start the broadcast relay if this instance's role calls for one.
    ///
    /// Idempotent. A bind failure is swallowed: another instance on
    /// this host already serves the port.
    pub async fn ensure_server(&self) {
        let mut server = self.server.lock().await;
        if server.is_some() || !self.config.should_serve() {
            return;
        }
        let Some(addr) = self.config.bind_addr() else {
            debug!(endpoint = %self.config.endpoint, "no bindable relay address");
            return;
        };
        match server::spawn(&addr).await {
            Ok((_, handle)) => {
                *server = Some(handle);
            }
            Err(e) => {
                debug!(addr = %addr, error = %e, "relay not started (likely already running)");
            }
        }
    }

    /// Connect the relay client. Idempotent while the connection is
    /// open; returns whether a connection is available.
    pub async fn connect(&self) -> bool {
        let mut outgoing = self.outgoing.lock().await;
        if let Some(tx) = outgoing.as_ref() {
            if !tx.is_closed() {
                return true;
            }
        }

        match connect_async(self.config.endpoint.as_str()).await {
            Ok((ws, _)) => {
                info!(endpoint = %self.config.endpoint, "connected to notification relay");
                let (tx, rx) = mpsc::channel(OUTGOING_BUFFER_SIZE);
                tokio::spawn(client_loop(ws, rx, self.incoming_tx.clone()));
                *outgoing = Some(tx);
                true
            }
            Err(e) => {
                debug!(endpoint = %self.config.endpoint, error = %e, "relay connect failed");
                *outgoing = None;
                false
            }
        }
    }

    /// Broadcast a change signal. Best-effort, at-most-once: if the
    /// transport is down or the buffer is full the signal is dropped
    /// and the polling fallback converges instead.
    pub async fn send(&self, signal: &ChangeSignal) {
        if !self.connect().await {
            return;
        }
        let outgoing = self.outgoing.lock().await;
        if let Some(tx) = outgoing.as_ref() {
            if tx.try_send(signal.to_payload()).is_err() {
                debug!(
                    conversation = %signal.conversation_id,
                    "change signal dropped; transport unavailable"
                );
            }
        }
    }

    /// Tear down the client connection and the relay task, if any.
    pub async fn shutdown(&self) {
        // Dropping the sender ends the client loop with a Close frame.
        self.outgoing.lock().await.take();
        if let Some(handle) = self.server.lock().await.take() {
            handle.abort();
        }
    }
}

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Pump outgoing signals to the relay and incoming payloads to the
/// dispatcher until either side closes. All errors end the loop
/// silently; reconnection happens on the next `send`.
async fn client_loop(
    ws: WsStream,
    mut outgoing_rx: mpsc::Receiver<String>,
    incoming_tx: mpsc::Sender<String>,
) {
    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            out = outgoing_rx.recv() => match out {
                Some(payload) => {
                    if write.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Text(payload))) => {
                    let _ = incoming_tx.send(payload).await;
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }
    debug!("relay client loop ended");
}
