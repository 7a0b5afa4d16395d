use relay_fcm::{DynPushProvider, PushNotification};
use tracing::{error, info};

use crate::metrics;
use crate::models::MessageRecord;

/// Notification field filled from a message record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationField {
    Title,
    Body,
}

/// Where a notification field is read from, and what to use when absent
#[derive(Debug, Clone, Copy)]
pub struct FieldDefault {
    pub field: NotificationField,
    /// Record keys tried in order; the first non-empty string wins
    pub sources: &'static [&'static str],
    pub default: &'static str,
}

/// Tolerant-read table for admin message records
pub const MESSAGE_FIELD_DEFAULTS: &[FieldDefault] = &[
    FieldDefault {
        field: NotificationField::Title,
        sources: &["senderName", "sender_name", "title"],
        default: "New Message",
    },
    FieldDefault {
        field: NotificationField::Body,
        sources: &["message", "body"],
        default: "You have a new message.",
    },
];

/// Resolve `field` from `record` using `MESSAGE_FIELD_DEFAULTS`
pub fn resolve_field(record: &MessageRecord, field: NotificationField) -> String {
    MESSAGE_FIELD_DEFAULTS
        .iter()
        .find(|entry| entry.field == field)
        .map(|entry| {
            entry
                .sources
                .iter()
                .find_map(|key| record.text(key))
                .unwrap_or(entry.default)
                .to_string()
        })
        .unwrap_or_default()
}

/// Forwards newly created admin messages to a single topic
pub struct MessageNotifier {
    provider: DynPushProvider,
    topic: String,
}

impl MessageNotifier {
    pub fn new(provider: DynPushProvider, topic: impl Into<String>) -> Self {
        Self {
            provider,
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn build_notification(record: &MessageRecord) -> PushNotification {
        PushNotification::new(
            resolve_field(record, NotificationField::Title),
            resolve_field(record, NotificationField::Body),
        )
    }

    /// Publish `record` to the topic. Never fails: a failed publish is logged
    /// and swallowed so the event source does not redeliver.
    pub async fn on_message_created(&self, record: &MessageRecord) {
        let notification = Self::build_notification(record);
        info!(
            topic = %self.topic,
            title = %notification.title,
            "Sending admin message notification"
        );

        match self.provider.send_to_topic(&self.topic, &notification).await {
            Ok(receipt) => {
                metrics::record_topic_publish(true);
                info!(message_id = %receipt.message_id, "Successfully sent notification");
            }
            Err(failure) => {
                metrics::record_topic_publish(false);
                error!(
                    topic = %self.topic,
                    reason = %failure.reason,
                    "Error sending notification: {}",
                    failure.detail
                );
            }
        }
    }
}
