//! Append-only transaction log.
//!
//! One record per line, `|`-delimited fields in the order
//! `id|kind|from|to|amount|reason|timestamp`. Free-text fields are
//! backslash-escaped so a reason containing the delimiter or a newline
//! round-trips. Records are never rewritten or deleted; `history` is a
//! linear scan that tolerates a concurrently appending writer and skips
//! lines it cannot parse.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use coincraft_shared::constants::{FIELD_DELIMITER, TRANSACTION_LOG_FILE};
use coincraft_shared::{TransactionKind, TransactionRecord};

use crate::error::{Result, StoreError};

/// Handle to the append-only transaction log file.
///
/// The file is created on first append. Reads never fail: a missing or
/// unreadable file yields an empty history.
#[derive(Debug, Clone)]
pub struct TransactionLog {
    path: PathBuf,
}

impl TransactionLog {
    /// Use the log file at `path`, creating parent directories up front.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let parent = path
            .parent()
            .ok_or_else(|| StoreError::InvalidPath(path.display().to_string()))?;
        std::fs::create_dir_all(parent)?;
        Ok(Self { path })
    }

    /// Use the standard log file name inside `data_dir`.
    pub fn open_in(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(data_dir.as_ref().join(TRANSACTION_LOG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single atomic line write.
    pub fn append(&self, record: &TransactionRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut line = encode_record(record);
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// The `limit` most-recent records involving `account_id`, in append
    /// order. Unparseable lines are skipped; a missing file is an empty
    /// history.
    pub fn history(&self, account_id: &str, limit: usize) -> Vec<TransactionRecord> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let mut matching = Vec::new();
        for line in BufReader::new(file).lines() {
            let Ok(line) = line else { break };
            match decode_record(&line) {
                Some(record) if record.involves(account_id) => matching.push(record),
                Some(_) => {}
                None => {
                    tracing::debug!(line = %line, "skipping malformed transaction log line");
                }
            }
        }

        if matching.len() > limit {
            matching.split_off(matching.len() - limit)
        } else {
            matching
        }
    }
}

fn encode_record(record: &TransactionRecord) -> String {
    let fields = [
        record.id.as_str(),
        record.kind.as_str(),
        record.from_account.as_deref().unwrap_or(""),
        record.to_account.as_deref().unwrap_or(""),
        &record.amount.to_string(),
        record.reason.as_str(),
        &record.timestamp.to_rfc3339(),
    ];
    fields
        .iter()
        .map(|f| escape(f))
        .collect::<Vec<_>>()
        .join(&FIELD_DELIMITER.to_string())
}

fn decode_record(line: &str) -> Option<TransactionRecord> {
    let fields = split_escaped(line);
    if fields.len() != 7 {
        return None;
    }

    let kind = TransactionKind::parse(&fields[1])?;
    let amount: u32 = fields[4].parse().ok()?;
    let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&fields[6])
        .ok()?
        .with_timezone(&Utc);

    let optional = |s: &str| {
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    };

    Some(TransactionRecord {
        id: fields[0].clone(),
        kind,
        from_account: optional(&fields[2]),
        to_account: optional(&fields[3]),
        amount,
        reason: fields[5].clone(),
        timestamp,
    })
}

/// Backslash-escape the delimiter, backslashes and newlines.
fn escape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c if c == FIELD_DELIMITER => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Split on the delimiter, honoring backslash escapes.
fn split_escaped(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => current.push('\n'),
                Some(escaped) => current.push(escaped),
                None => break,
            },
            c if c == FIELD_DELIMITER => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log() -> (tempfile::TempDir, TransactionLog) {
        let dir = tempfile::tempdir().unwrap();
        let log = TransactionLog::open_in(dir.path()).unwrap();
        (dir, log)
    }

    #[test]
    fn append_and_read_back() {
        let (_dir, log) = temp_log();
        log.append(&TransactionRecord::credit("alice", 50, "bonus"))
            .unwrap();
        log.append(&TransactionRecord::debit("alice", 30, "purchase"))
            .unwrap();
        log.append(&TransactionRecord::transfer("bob", "carol", 5, "gift"))
            .unwrap();

        let history = log.history("alice", 10);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, TransactionKind::Credit);
        assert_eq!(history[0].amount, 50);
        assert_eq!(history[1].kind, TransactionKind::Debit);
        assert_eq!(history[1].amount, 30);
    }

    #[test]
    fn history_honors_limit_and_participant() {
        let (_dir, log) = temp_log();
        for i in 1..=5 {
            log.append(&TransactionRecord::credit("alice", i, "weekly"))
                .unwrap();
        }
        log.append(&TransactionRecord::credit("bob", 99, "other"))
            .unwrap();

        let history = log.history("alice", 3);
        assert_eq!(history.len(), 3);
        // Most-recent three, append order preserved.
        assert_eq!(
            history.iter().map(|r| r.amount).collect::<Vec<_>>(),
            vec![3, 4, 5]
        );
        for record in &history {
            assert!(record.involves("alice"));
        }
    }

    #[test]
    fn reason_with_delimiter_round_trips() {
        let (_dir, log) = temp_log();
        let reason = "chores | week 2\nwith newline and \\ backslash";
        log.append(&TransactionRecord::credit("alice", 7, reason))
            .unwrap();

        let history = log.history("alice", 1);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reason, reason);
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let (_dir, log) = temp_log();
        log.append(&TransactionRecord::credit("alice", 1, "ok"))
            .unwrap();
        std::fs::write(
            log.path(),
            format!(
                "{}\nnot a record\ntxn_x|CREDIT||alice|not-a-number|r|bad-ts\n",
                std::fs::read_to_string(log.path()).unwrap().trim_end()
            ),
        )
        .unwrap();
        log.append(&TransactionRecord::credit("alice", 2, "also ok"))
            .unwrap();

        let history = log.history("alice", 10);
        assert_eq!(
            history.iter().map(|r| r.amount).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let log = TransactionLog::open(dir.path().join("never-written.log")).unwrap();
        assert!(log.history("alice", 10).is_empty());
    }
}
