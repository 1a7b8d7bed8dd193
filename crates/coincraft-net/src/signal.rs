//! Change-signal wire payload.
//!
//! An opaque UTF-8 string `conversation_id|rfc3339-timestamp`. The hub
//! relays it without interpretation; receivers only need the
//! conversation id to decide what to re-fetch, so a payload with a
//! missing or unparseable timestamp is still usable and anything
//! without a conversation id is ignored.

use chrono::{DateTime, Utc};

use coincraft_shared::constants::FIELD_DELIMITER;

/// A "conversation changed" signal broadcast between instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSignal {
    pub conversation_id: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChangeSignal {
    /// Signal that `conversation_id` changed just now.
    pub fn now(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            timestamp: Some(Utc::now()),
        }
    }

    /// Encode for the wire.
    pub fn to_payload(&self) -> String {
        let ts = self
            .timestamp
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        format!("{}{FIELD_DELIMITER}{ts}", self.conversation_id)
    }

    /// Decode a wire payload. `None` means the payload carries no
    /// usable conversation id and must be ignored.
    pub fn parse(payload: &str) -> Option<Self> {
        let (conversation_id, ts) = match payload.split_once(FIELD_DELIMITER) {
            Some((conv, ts)) => (conv, Some(ts)),
            None => (payload, None),
        };
        if conversation_id.is_empty() {
            return None;
        }
        let timestamp = ts
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc));
        Some(Self {
            conversation_id: conversation_id.to_string(),
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let signal = ChangeSignal::now("alice:bob");
        let parsed = ChangeSignal::parse(&signal.to_payload()).unwrap();
        assert_eq!(parsed.conversation_id, "alice:bob");
        assert_eq!(parsed.timestamp, signal.timestamp);
    }

    #[test]
    fn bare_conversation_id_is_accepted() {
        let parsed = ChangeSignal::parse("alice:bob").unwrap();
        assert_eq!(parsed.conversation_id, "alice:bob");
        assert_eq!(parsed.timestamp, None);
    }

    #[test]
    fn unparseable_timestamp_is_dropped_not_fatal() {
        let parsed = ChangeSignal::parse("alice:bob|yesterday-ish").unwrap();
        assert_eq!(parsed.conversation_id, "alice:bob");
        assert_eq!(parsed.timestamp, None);
    }

    #[test]
    fn empty_payloads_are_ignored() {
        assert_eq!(ChangeSignal::parse(""), None);
        assert_eq!(ChangeSignal::parse("|2024-01-01T00:00:00Z"), None);
    }
}
