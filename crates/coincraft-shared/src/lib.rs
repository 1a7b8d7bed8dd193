//! # coincraft-shared
//!
//! Domain models and constants shared by every CoinCraft crate: user
//! accounts, transaction records, chat messages and the deterministic
//! conversation key that ties two participants together.

pub mod constants;
pub mod models;

pub use models::{
    conversation_key, Message, TransactionKind, TransactionRecord, User, UserRole,
};
