//! Conversation change dispatch.
//!
//! Both transports — the push path (relay payloads) and the poll path
//! (timed re-fetch) — funnel into one idempotent [`Dispatcher::maybe_notify`]
//! keyed by the newest timestamp observed per subscription. A listener
//! is therefore notified exactly once per distinct snapshot no matter
//! which transport noticed the change first, and a burst of sends
//! between two ticks arrives as a single batch.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use coincraft_shared::constants::CONVERSATION_WINDOW;
use coincraft_shared::Message;

use crate::signal::ChangeSignal;

/// Where the dispatcher re-fetches conversation windows from.
///
/// Infallible by contract: a transport failure yields an empty window,
/// which simply produces no notification.
#[async_trait]
pub trait ConversationSource: Send + Sync {
    async fn fetch(&self, conversation_id: &str, limit: usize) -> Vec<Message>;
}

/// Invoked with the full fetched window whenever a watched conversation
/// has a newer snapshot. Runs on a hub task, never on a caller thread;
/// UI marshalling is the subscriber's concern.
pub type MessageCallback = Arc<dyn Fn(Vec<Message>) + Send + Sync>;

/// Opaque handle for removing a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    conversation_id: String,
    last_seen: Option<DateTime<Utc>>,
    callback: MessageCallback,
}

/// Registry of conversation subscriptions plus the shared notify rule.
pub struct Dispatcher {
    source: Arc<dyn ConversationSource>,
    subscriptions: Mutex<HashMap<SubscriptionId, Subscription>>,
    next_id: AtomicU64,
}

impl Dispatcher {
    pub fn new(source: Arc<dyn ConversationSource>) -> Self {
        Self {
            source,
            subscriptions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener for `conversation_id` live updates.
    pub async fn subscribe(
        &self,
        conversation_id: impl Into<String>,
        callback: MessageCallback,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.lock().await.insert(
            id,
            Subscription {
                conversation_id: conversation_id.into(),
                last_seen: None,
                callback,
            },
        );
        id
    }

    /// Remove a listener (no-op for an unknown id).
    pub async fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.lock().await.remove(&id);
    }

    /// Re-fetch `conversation_id` and notify every subscription whose
    /// `last_seen` is older than the freshest message. Push and poll
    /// both call this, so the dedup rule lives in exactly one place.
    pub async fn maybe_notify(&self, conversation_id: &str) {
        let window = self
            .source
            .fetch(conversation_id, CONVERSATION_WINDOW)
            .await;
        let Some(newest) = window.last().map(|m| m.timestamp) else {
            return;
        };

        // Collect callbacks under the lock, invoke outside it.
        let mut due = Vec::new();
        {
            let mut subscriptions = self.subscriptions.lock().await;
            for subscription in subscriptions.values_mut() {
                if subscription.conversation_id != conversation_id {
                    continue;
                }
                let is_new = subscription.last_seen.map_or(true, |seen| newest > seen);
                if is_new {
                    subscription.last_seen = Some(newest);
                    due.push(subscription.callback.clone());
                }
            }
        }
        for callback in due {
            callback(window.clone());
        }
    }

    /// One poll tick: re-check every watched conversation.
    pub async fn poll_once(&self) {
        let conversations: HashSet<String> = {
            let subscriptions = self.subscriptions.lock().await;
            subscriptions
                .values()
                .map(|s| s.conversation_id.clone())
                .collect()
        };
        for conversation_id in conversations {
            self.maybe_notify(&conversation_id).await;
        }
    }

    /// Spawn the polling fallback. Guarantees bounded delivery latency
    /// (one `interval`) independent of the push transport's health.
    /// Send on the returned channel (or drop it) to stop the loop.
    pub fn spawn_poll_loop(
        self: &Arc<Self>,
        interval: Duration,
    ) -> (JoinHandle<()>, mpsc::Sender<()>) {
        let dispatcher = Arc::clone(self);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => dispatcher.poll_once().await,
                    _ = shutdown_rx.recv() => break,
                }
            }
            debug!("poll loop stopped");
        });
        (handle, shutdown_tx)
    }

    /// Spawn the push fast path: consume raw relay payloads and run the
    /// notify rule for the signalled conversation. Ends when the hub
    /// closes the channel.
    pub fn spawn_push_loop(
        self: &Arc<Self>,
        mut incoming: mpsc::Receiver<String>,
    ) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(payload) = incoming.recv().await {
                match ChangeSignal::parse(&payload) {
                    Some(signal) => dispatcher.maybe_notify(&signal.conversation_id).await,
                    None => debug!(payload = %payload, "ignoring malformed change signal"),
                }
            }
            debug!("push loop stopped");
        })
    }
}
