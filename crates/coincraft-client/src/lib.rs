//! # coincraft-client
//!
//! Composition root for the CoinCraft core. A process builds one
//! [`CoreServices`] with its record store adapter and gets back wired,
//! dependency-injected instances of the ledger, the message directory
//! and the notification hub — no global singletons, so tests compose
//! the same services around fake adapters.

pub mod directory;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use coincraft_ledger::Ledger;
use coincraft_net::{
    Dispatcher, HubConfig, MessageCallback, NotificationHub, SubscriptionId,
};
use coincraft_shared::constants::SESSION_CACHE_TTL_SECS;
use coincraft_store::{RecordStore, SessionCache, TransactionLog};

pub use directory::MessageDirectory;

/// All core services of one application instance, plus the background
/// tasks that keep conversations live.
pub struct CoreServices {
    pub ledger: Arc<Ledger>,
    pub directory: Arc<MessageDirectory>,
    hub: Arc<NotificationHub>,
    dispatcher: Arc<Dispatcher>,
    poll_task: JoinHandle<()>,
    poll_shutdown: mpsc::Sender<()>,
    push_task: JoinHandle<()>,
}

impl CoreServices {
    /// Wire up the core and start its background tasks: the broadcast
    /// relay (when this instance's role calls for one), the relay
    /// client, the push dispatch loop and the polling fallback.
    pub async fn start(
        config: HubConfig,
        store: Arc<dyn RecordStore>,
        log_path: impl Into<PathBuf>,
    ) -> anyhow::Result<Self> {
        let log = TransactionLog::open(log_path)?;
        let cache = Arc::new(SessionCache::new(Duration::from_secs(
            SESSION_CACHE_TTL_SECS,
        )));
        let ledger = Arc::new(Ledger::new(store.clone(), log, cache));

        let poll_interval = config.poll_interval;
        let (hub, incoming) = NotificationHub::new(config);
        let hub = Arc::new(hub);
        hub.ensure_server().await;
        // Best-effort: a failed connect degrades to polling.
        hub.connect().await;

        let directory = Arc::new(MessageDirectory::new(store, hub.clone()));
        let dispatcher = Arc::new(Dispatcher::new(directory.clone()));
        let push_task = dispatcher.spawn_push_loop(incoming);
        let (poll_task, poll_shutdown) = dispatcher.spawn_poll_loop(poll_interval);

        Ok(Self {
            ledger,
            directory,
            hub,
            dispatcher,
            poll_task,
            poll_shutdown,
            push_task,
        })
    }

    /// Register a live-update listener for a conversation (e.g. an open
    /// chat view). The callback runs on a hub task.
    pub async fn subscribe(
        &self,
        conversation_id: impl Into<String>,
        callback: MessageCallback,
    ) -> SubscriptionId {
        self.dispatcher.subscribe(conversation_id, callback).await
    }

    /// Drop a listener once its view closes.
    pub async fn unsubscribe(&self, id: SubscriptionId) {
        self.dispatcher.unsubscribe(id).await
    }

    /// Stop and join the background tasks.
    pub async fn shutdown(self) {
        let _ = self.poll_shutdown.send(()).await;
        let _ = self.poll_task.await;
        self.hub.shutdown().await;
        // The push loop blocks on the hub's incoming channel, which the
        // hub keeps open; abort instead of joining.
        self.push_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use coincraft_net::HubRole;
    use coincraft_shared::{conversation_key, Message, TransactionKind, User, UserRole};
    use coincraft_store::MemoryStore;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    /// Config with no reachable push transport, so only polling runs.
    fn poll_only_config(poll_ms: u64) -> HubConfig {
        HubConfig {
            endpoint: "ws://127.0.0.1:1".to_string(),
            role: HubRole::Client,
            poll_interval: Duration::from_millis(poll_ms),
        }
    }

    fn capture() -> (MessageCallback, Arc<std::sync::Mutex<Vec<Vec<Message>>>>) {
        let snapshots: Arc<std::sync::Mutex<Vec<Vec<Message>>>> = Arc::default();
        let sink = snapshots.clone();
        let callback: MessageCallback = Arc::new(move |window| {
            sink.lock().unwrap().push(window);
        });
        (callback, snapshots)
    }

    async fn start(config: HubConfig, store: Arc<MemoryStore>) -> (CoreServices, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let services = CoreServices::start(config, store, dir.path().join("transactions.log"))
            .await
            .unwrap();
        (services, dir)
    }

    #[tokio::test]
    async fn message_is_delivered_within_one_poll_interval() {
        init_tracing();
        let store = Arc::new(MemoryStore::new());
        let (services, _dir) = start(poll_only_config(25), store).await;

        let conversation = conversation_key("parent-1", "child-1");
        let (callback, snapshots) = capture();
        services.subscribe(conversation.clone(), callback).await;

        assert!(
            services
                .directory
                .send(&conversation, "parent-1", "Mom", "child-1", "Kid", "dinner time")
                .await
        );

        // Poll interval is 25 ms; well within a few intervals the
        // listener must have fired.
        tokio::time::sleep(Duration::from_millis(300)).await;
        let snapshots = snapshots.lock().unwrap();
        assert!(!snapshots.is_empty(), "poll fallback never delivered");
        assert_eq!(snapshots.last().unwrap().last().unwrap().content, "dinner time");
    }

    #[tokio::test]
    async fn rapid_sends_are_batched_not_lost() {
        init_tracing();
        let store = Arc::new(MemoryStore::new());
        let (services, _dir) = start(poll_only_config(200), store).await;

        let conversation = conversation_key("parent-1", "child-1");
        let (callback, snapshots) = capture();
        services.subscribe(conversation.clone(), callback).await;

        for content in ["first", "second"] {
            assert!(
                services
                    .directory
                    .send(&conversation, "parent-1", "Mom", "child-1", "Kid", content)
                    .await
            );
        }

        tokio::time::sleep(Duration::from_millis(600)).await;
        let snapshots = snapshots.lock().unwrap();
        assert!(!snapshots.is_empty());
        let contents: Vec<_> = snapshots
            .last()
            .unwrap()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert!(contents.contains(&"first") && contents.contains(&"second"));
    }

    #[tokio::test]
    async fn push_path_delivers_across_instances() {
        init_tracing();
        // Both instances share one document store, as they would share
        // one Firestore project.
        let store = Arc::new(MemoryStore::new());
        let (addr, _relay) = coincraft_net::server::spawn("127.0.0.1:0").await.unwrap();

        let slow_poll = |endpoint: String| HubConfig {
            endpoint,
            role: HubRole::Client,
            // Long enough that only the push path can explain a fast
            // delivery.
            poll_interval: Duration::from_secs(30),
        };
        let (sender, _dir_a) = start(slow_poll(format!("ws://{addr}")), store.clone()).await;
        let (receiver, _dir_b) = start(slow_poll(format!("ws://{addr}")), store).await;

        let conversation = conversation_key("parent-1", "child-1");
        let (callback, snapshots) = capture();
        receiver.subscribe(conversation.clone(), callback).await;

        assert!(
            sender
                .directory
                .send(&conversation, "parent-1", "Mom", "child-1", "Kid", "hello")
                .await
        );

        let mut waited = Duration::ZERO;
        while snapshots.lock().unwrap().is_empty() && waited < Duration::from_secs(3) {
            tokio::time::sleep(Duration::from_millis(25)).await;
            waited += Duration::from_millis(25);
        }
        let snapshots = snapshots.lock().unwrap();
        assert!(!snapshots.is_empty(), "push path never delivered");
        assert_eq!(snapshots[0].last().unwrap().content, "hello");

        drop(snapshots);
        sender.shutdown().await;
        receiver.shutdown().await;
    }

    #[tokio::test]
    async fn ledger_is_wired_through_the_same_composition() {
        init_tracing();
        let store = Arc::new(MemoryStore::new());
        store
            .insert_user(User::new("alice", "Alice", UserRole::Child))
            .await;
        let (services, _dir) = start(poll_only_config(500), store).await;

        services.ledger.credit("alice", 50, "bonus").await.unwrap();
        services.ledger.debit("alice", 30, "purchase").await.unwrap();

        let history = services.ledger.history("alice", 10);
        assert_eq!(
            history.iter().map(|r| (r.kind, r.amount)).collect::<Vec<_>>(),
            vec![(TransactionKind::Credit, 50), (TransactionKind::Debit, 30)]
        );
        assert_eq!(services.ledger.balance("alice").await.unwrap(), 20);

        services.shutdown().await;
    }
}
