use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::CONVERSATION_SEPARATOR;

/// Role of an account holder. The core only stores it; routing between
/// parent and child dashboards happens in the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Parent,
    Child,
    Admin,
}

/// A user account as stored in the remote record store.
///
/// `balance` is the SmartCoin balance; it is non-negative by
/// construction and only the ledger may change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub balance: u32,
    pub role: UserRole,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            balance: 0,
            role,
        }
    }
}

/// Kind of balance mutation a [`TransactionRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Credit,
    Debit,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "CREDIT",
            Self::Debit => "DEBIT",
            Self::Transfer => "TRANSFER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREDIT" => Some(Self::Credit),
            "DEBIT" => Some(Self::Debit),
            "TRANSFER" => Some(Self::Transfer),
            _ => None,
        }
    }
}

/// Immutable record of one balance mutation.
///
/// Shape invariants: `amount > 0` always; a credit has no source
/// account, a debit has no destination account, a transfer has both
/// and they differ. The constructors below are the only way the ledger
/// builds records, so the invariants hold for every appended record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub kind: TransactionKind,
    pub from_account: Option<String>,
    pub to_account: Option<String>,
    pub amount: u32,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn credit(to_account: impl Into<String>, amount: u32, reason: impl Into<String>) -> Self {
        Self {
            id: new_transaction_id(),
            kind: TransactionKind::Credit,
            from_account: None,
            to_account: Some(to_account.into()),
            amount,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn debit(from_account: impl Into<String>, amount: u32, reason: impl Into<String>) -> Self {
        Self {
            id: new_transaction_id(),
            kind: TransactionKind::Debit,
            from_account: Some(from_account.into()),
            to_account: None,
            amount,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn transfer(
        from_account: impl Into<String>,
        to_account: impl Into<String>,
        amount: u32,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: new_transaction_id(),
            kind: TransactionKind::Transfer,
            from_account: Some(from_account.into()),
            to_account: Some(to_account.into()),
            amount,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    /// Whether `account_id` appears on either side of this record.
    pub fn involves(&self, account_id: &str) -> bool {
        self.from_account.as_deref() == Some(account_id)
            || self.to_account.as_deref() == Some(account_id)
    }
}

fn new_transaction_id() -> String {
    format!("txn_{}", Uuid::new_v4())
}

/// A chat message between two participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub recipient_id: String,
    pub recipient_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(
        conversation_id: impl Into<String>,
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        recipient_id: impl Into<String>,
        recipient_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("msg_{}", Uuid::new_v4()),
            conversation_id: conversation_id.into(),
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            recipient_id: recipient_id.into(),
            recipient_name: recipient_name.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Deterministic conversation identity for a pair of participants.
///
/// Order-independent: `conversation_key("a", "b")` and
/// `conversation_key("b", "a")` name the same conversation.
pub fn conversation_key(participant_a: &str, participant_b: &str) -> String {
    let (first, second) = if participant_a <= participant_b {
        (participant_a, participant_b)
    } else {
        (participant_b, participant_a)
    };
    format!("{first}{CONVERSATION_SEPARATOR}{second}")
}
