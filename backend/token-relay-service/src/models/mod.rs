use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A registered recipient and its current device token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientRecord {
    /// Stable user/device identifier (unique key)
    pub recipient_id: String,
    /// Opaque provider token; rotates over the device lifetime
    pub token: String,
    pub updated_at: DateTime<Utc>,
}

/// Result of a successful `register_token`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOutcome {
    pub recipient_id: String,
    pub token: String,
}

/// Audit record of one broadcast attempt. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastMessage {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub success_count: i32,
    pub failure_count: i32,
    pub created_at: DateTime<Utc>,
}

/// What a broadcast achieved. Built once per dispatch, not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub success_count: usize,
    pub failure_count: usize,
    /// Tokens the provider reported as permanently undeliverable
    pub invalid_tokens: BTreeSet<String>,
    /// Recipients removed from the registry as a consequence
    pub pruned_recipients: BTreeSet<String>,
}

impl DispatchResult {
    pub fn attempted(&self) -> usize {
        self.success_count + self.failure_count
    }
}

/// Fields of a newly created admin message, read tolerantly.
///
/// Wraps the raw JSON object; lookups go through the field/default table in
/// `services::message_notifier`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageRecord(pub serde_json::Map<String, serde_json::Value>);

impl MessageRecord {
    /// Parse an event payload. Anything that is not a JSON object becomes an
    /// empty record.
    pub fn from_payload(payload: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(payload) {
            Ok(serde_json::Value::Object(map)) => MessageRecord(map),
            _ => MessageRecord::default(),
        }
    }

    /// Non-empty string value of `field`, if any
    pub fn text(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

impl From<serde_json::Value> for MessageRecord {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => MessageRecord(map),
            _ => MessageRecord::default(),
        }
    }
}
