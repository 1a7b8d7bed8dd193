/// Default WebSocket endpoint for the local notification hub.
pub const DEFAULT_HUB_URL: &str = "ws://127.0.0.1:8123";

/// Polling interval for the conversation re-fetch fallback, in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 2_000;

/// Number of messages re-fetched per conversation on a change signal or
/// poll tick.
pub const CONVERSATION_WINDOW: usize = 100;

/// Session cache time-to-live in seconds (5 minutes).
pub const SESSION_CACHE_TTL_SECS: u64 = 300;

/// File name of the append-only transaction log.
pub const TRANSACTION_LOG_FILE: &str = "transactions.log";

/// Field delimiter used by the transaction log and the hub wire payload.
pub const FIELD_DELIMITER: char = '|';

/// Separator joining the two participant ids of a conversation key.
pub const CONVERSATION_SEPARATOR: char = ':';
