//! Message directory.
//!
//! Thin layer over the record store for per-conversation messages. A
//! successful persist triggers a best-effort change signal so other
//! instances re-fetch immediately; if the broadcast is lost the polling
//! fallback still converges. No caching here: readers are humans
//! waiting on a chat, so freshness wins over round-trip cost.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use coincraft_net::{ChangeSignal, ConversationSource, NotificationHub};
use coincraft_shared::Message;
use coincraft_store::RecordStore;

/// Persists and retrieves ordered conversation messages, feeding the
/// notification hub on every successful send.
pub struct MessageDirectory {
    store: Arc<dyn RecordStore>,
    hub: Arc<NotificationHub>,
}

impl MessageDirectory {
    pub fn new(store: Arc<dyn RecordStore>, hub: Arc<NotificationHub>) -> Self {
        Self { store, hub }
    }

    /// Persist a new message; on success broadcast a change signal for
    /// its conversation. Returns the adapter's verdict unchanged —
    /// broadcast failure is deliberately ignored.
    pub async fn send(
        &self,
        conversation_id: &str,
        sender_id: &str,
        sender_name: &str,
        recipient_id: &str,
        recipient_name: &str,
        content: &str,
    ) -> bool {
        let message = Message::new(
            conversation_id,
            sender_id,
            sender_name,
            recipient_id,
            recipient_name,
            content,
        );
        let ok = self.store.save_message(&message).await;
        if ok {
            debug!(conversation = %conversation_id, message = %message.id, "message stored");
            self.hub.send(&ChangeSignal::now(conversation_id)).await;
        } else {
            warn!(conversation = %conversation_id, "message persist failed");
        }
        ok
    }

    /// The `limit` most-recent messages of a conversation, oldest
    /// first. Empty on store failure.
    pub async fn recent(&self, conversation_id: &str, limit: usize) -> Vec<Message> {
        self.store.load_conversation(conversation_id, limit).await
    }
}

#[async_trait]
impl ConversationSource for MessageDirectory {
    async fn fetch(&self, conversation_id: &str, limit: usize) -> Vec<Message> {
        self.recent(conversation_id, limit).await
    }
}
