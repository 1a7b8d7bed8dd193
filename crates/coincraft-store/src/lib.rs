//! # coincraft-store
//!
//! Persistence layer for the CoinCraft core: the [`RecordStore`]
//! boundary to the remote document store, the append-only
//! [`TransactionLog`] on local disk, and the advisory TTL-bounded
//! [`SessionCache`].
//!
//! The remote store itself is an external collaborator; this crate only
//! defines the read/write contract the core requires of it, plus an
//! in-memory implementation used offline and in tests.

pub mod adapter;
pub mod cache;
pub mod txlog;

mod error;

pub use adapter::{MemoryStore, RecordStore};
pub use cache::SessionCache;
pub use error::StoreError;
pub use txlog::TransactionLog;
