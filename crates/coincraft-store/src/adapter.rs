//! Record store adapter boundary.
//!
//! The remote document store (user records, conversation messages) is
//! an external collaborator. The core consumes it through the
//! [`RecordStore`] trait and treats every failure as a soft one: a
//! missing record is `None`, a failed write is `false`, and nothing at
//! this boundary panics or propagates an error type.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use coincraft_shared::{Message, User};

/// Read/write contract the core requires of the remote document store.
///
/// Implementations must report failure through the return value
/// (`None` / `false` / empty), never by panicking.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load a user record by id. `None` on miss or transport failure.
    async fn load_user(&self, id: &str) -> Option<User>;

    /// Persist a user record. `false` on transport failure.
    async fn save_user(&self, user: &User) -> bool;

    /// Load up to `limit` most-recent messages of a conversation,
    /// ordered by timestamp ascending (ties in insertion order).
    /// Empty on failure.
    async fn load_conversation(&self, conversation_id: &str, limit: usize) -> Vec<Message>;

    /// Persist one message. `false` on transport failure.
    async fn save_message(&self, message: &Message) -> bool;
}

/// In-memory [`RecordStore`].
///
/// Backs the offline data path and doubles as the test fake; writes can
/// be forced to fail to exercise the callers' failure handling.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    // Per conversation, in insertion order.
    conversations: RwLock<HashMap<String, Vec<Message>>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every `save_*` call reports failure without applying.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Seed a user record directly, bypassing the failure toggle.
    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn load_user(&self, id: &str) -> Option<User> {
        self.users.read().await.get(id).cloned()
    }

    async fn save_user(&self, user: &User) -> bool {
        if self.fail_writes.load(Ordering::SeqCst) {
            return false;
        }
        self.users
            .write()
            .await
            .insert(user.id.clone(), user.clone());
        true
    }

    async fn load_conversation(&self, conversation_id: &str, limit: usize) -> Vec<Message> {
        let conversations = self.conversations.read().await;
        let Some(messages) = conversations.get(conversation_id) else {
            return Vec::new();
        };

        // Stable sort: messages with equal timestamps keep insertion order.
        let mut ordered = messages.clone();
        ordered.sort_by_key(|m| m.timestamp);

        if ordered.len() > limit {
            ordered.split_off(ordered.len() - limit)
        } else {
            ordered
        }
    }

    async fn save_message(&self, message: &Message) -> bool {
        if self.fail_writes.load(Ordering::SeqCst) {
            return false;
        }
        self.conversations
            .write()
            .await
            .entry(message.conversation_id.clone())
            .or_default()
            .push(message.clone());
        true
    }
}
