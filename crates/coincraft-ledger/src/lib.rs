//! # coincraft-ledger
//!
//! The SmartCoin transaction ledger. All balance mutations in the
//! application go through the [`Ledger`]: it serializes concurrent
//! requests under one critical section, persists the new balance to the
//! record store before exposing it anywhere, and appends an immutable
//! record to the local append-only log.

mod error;
mod ledger;

pub use error::LedgerError;
pub use ledger::Ledger;
