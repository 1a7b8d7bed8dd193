use thiserror::Error;

/// Errors produced by ledger operations.
///
/// Every variant means the operation applied nothing: no balance moved,
/// no record was appended.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount was zero (amounts are `u32`, so negatives cannot occur).
    #[error("Transaction amount must be positive")]
    InvalidAmount,

    /// Transfer source and destination are the same account.
    #[error("Cannot transfer an account to itself")]
    SelfTransfer,

    /// The account id resolved to no record.
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    /// The source account holds fewer coins than requested.
    #[error("Insufficient balance: have {available}, need {requested}")]
    InsufficientBalance { available: u32, requested: u32 },

    /// Crediting would overflow the balance counter.
    #[error("Balance overflow on account {0}")]
    BalanceOverflow(String),

    /// The record store rejected a write, or the local log could not be
    /// appended.
    #[error("Storage failure: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
