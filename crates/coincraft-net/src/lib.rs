//! # coincraft-net
//!
//! The realtime notification hub: a dual-transport pub/sub layer that
//! tells co-located application instances "this conversation has new
//! messages".
//!
//! The fast path is a loopback WebSocket broadcast relay ([`server`],
//! [`hub`]); the reliable path is a timed re-fetch of every watched
//! conversation ([`dispatch`]). Both feed one idempotent notify
//! function keyed by the newest observed timestamp, so a listener is
//! notified once per distinct snapshot regardless of which transport
//! fired first.

pub mod config;
pub mod dispatch;
pub mod hub;
pub mod server;
pub mod signal;

pub use config::{HubConfig, HubRole};
pub use dispatch::{ConversationSource, Dispatcher, MessageCallback, SubscriptionId};
pub use hub::NotificationHub;
pub use signal::ChangeSignal;
