//! Ledger service.
//!
//! One coarse mutation lock serializes `credit`/`debit`/`transfer`,
//! and the critical section spans the remote persistence call: a
//! balance update is never observable before its durable write has been
//! confirmed. `history` reads the append-only log without taking the
//! lock.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use coincraft_shared::{TransactionRecord, User};
use coincraft_store::{RecordStore, SessionCache, TransactionLog};

use crate::error::{LedgerError, Result};

/// The SmartCoin ledger.
///
/// Explicitly constructed and dependency-injected; a process composes
/// exactly one instance and hands out references.
pub struct Ledger {
    store: Arc<dyn RecordStore>,
    log: TransactionLog,
    cache: Arc<SessionCache<String, User>>,
    // Guards every read-modify-write of a balance, including the
    // persistence round-trip.
    mutation: Mutex<()>,
}

impl Ledger {
    pub fn new(
        store: Arc<dyn RecordStore>,
        log: TransactionLog,
        cache: Arc<SessionCache<String, User>>,
    ) -> Self {
        Self {
            store,
            log,
            cache,
            mutation: Mutex::new(()),
        }
    }

    /// Atomically increase `account_id`'s balance by `amount`.
    pub async fn credit(
        &self,
        account_id: &str,
        amount: u32,
        reason: &str,
    ) -> Result<TransactionRecord> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let _guard = self.mutation.lock().await;

        let mut account = self.load_account(account_id).await?;
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::BalanceOverflow(account_id.to_string()))?;

        self.persist(&account).await?;

        let record = TransactionRecord::credit(account_id, amount, reason);
        self.append(&record)?;
        info!(account = %account_id, amount, reason, "credited");
        Ok(record)
    }

    /// Atomically decrease `account_id`'s balance by `amount`.
    pub async fn debit(
        &self,
        account_id: &str,
        amount: u32,
        reason: &str,
    ) -> Result<TransactionRecord> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let _guard = self.mutation.lock().await;

        let mut account = self.load_account(account_id).await?;
        if account.balance < amount {
            return Err(LedgerError::InsufficientBalance {
                available: account.balance,
                requested: amount,
            });
        }
        account.balance -= amount;

        self.persist(&account).await?;

        let record = TransactionRecord::debit(account_id, amount, reason);
        self.append(&record)?;
        info!(account = %account_id, amount, reason, "debited");
        Ok(record)
    }

    /// Atomically move `amount` from one account to another.
    pub async fn transfer(
        &self,
        from_id: &str,
        to_id: &str,
        amount: u32,
        reason: &str,
    ) -> Result<TransactionRecord> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if from_id == to_id {
            return Err(LedgerError::SelfTransfer);
        }

        let _guard = self.mutation.lock().await;

        let original_from = self.load_account(from_id).await?;
        let mut to = self.load_account(to_id).await?;
        if original_from.balance < amount {
            return Err(LedgerError::InsufficientBalance {
                available: original_from.balance,
                requested: amount,
            });
        }

        let mut from = original_from.clone();
        from.balance -= amount;
        to.balance = to
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::BalanceOverflow(to_id.to_string()))?;

        self.persist(&from).await?;
        if !self.store.save_user(&to).await {
            // Compensate the already-written source balance.
            if !self.store.save_user(&original_from).await {
                warn!(
                    account = %from_id,
                    "failed to restore source balance after aborted transfer"
                );
            }
            self.cache.invalidate(&from_id.to_string()).await;
            return Err(LedgerError::Storage(format!(
                "failed to persist account {to_id}"
            )));
        }
        self.cache.put(to_id.to_string(), to).await;

        let record = TransactionRecord::transfer(from_id, to_id, amount, reason);
        self.append(&record)?;
        info!(from = %from_id, to = %to_id, amount, reason, "transferred");
        Ok(record)
    }

    /// Credit issued when a task is approved. Same semantics as
    /// [`Ledger::credit`], with a uniform reason prefix for the history
    /// views.
    pub async fn award(
        &self,
        account_id: &str,
        amount: u32,
        task_title: &str,
    ) -> Result<TransactionRecord> {
        self.credit(account_id, amount, &format!("Task reward: {task_title}"))
            .await
    }

    /// The `limit` most-recent records involving `account_id`, in append
    /// order. Never errors; a failed read is an empty history.
    pub fn history(&self, account_id: &str, limit: usize) -> Vec<TransactionRecord> {
        self.log.history(account_id, limit)
    }

    /// Current balance of `account_id`, through the session cache.
    pub async fn balance(&self, account_id: &str) -> Result<u32> {
        Ok(self.load_account(account_id).await?.balance)
    }

    async fn load_account(&self, account_id: &str) -> Result<User> {
        let key = account_id.to_string();
        if let Some(user) = self.cache.get(&key).await {
            return Ok(user);
        }
        let user = self
            .store
            .load_user(account_id)
            .await
            .ok_or_else(|| LedgerError::UnknownAccount(account_id.to_string()))?;
        self.cache.put(key, user.clone()).await;
        Ok(user)
    }

    /// Write the staged balance to the record store; the cache only
    /// learns the new value after the store confirms.
    async fn persist(&self, account: &User) -> Result<()> {
        if !self.store.save_user(account).await {
            return Err(LedgerError::Storage(format!(
                "failed to persist account {}",
                account.id
            )));
        }
        self.cache.put(account.id.clone(), account.clone()).await;
        Ok(())
    }

    fn append(&self, record: &TransactionRecord) -> Result<()> {
        self.log.append(record).map_err(|e| {
            warn!(record = %record.id, error = %e, "transaction log append failed");
            LedgerError::Storage(format!("failed to append transaction record: {e}"))
        })
    }
}
