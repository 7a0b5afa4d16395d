/// Event source for the message notifier
///
/// Inserts into `admin_messages` fire a trigger that publishes the new row as
/// JSON on the `admin_messages_created` channel. Delivery is at-least-once
/// while connected; notifications sent while the listener is reconnecting
/// are lost, which matches the best-effort topic semantics.
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::message_notifier::MessageNotifier;
use crate::models::MessageRecord;

/// Channel used by the `admin_messages` insert trigger
pub const ADMIN_EVENTS_CHANNEL: &str = "admin_messages_created";

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub struct AdminMessageListener {
    db: PgPool,
    notifier: Arc<MessageNotifier>,
}

impl AdminMessageListener {
    pub fn new(db: PgPool, notifier: Arc<MessageNotifier>) -> Self {
        Self { db, notifier }
    }

    /// Listen forever, reconnecting after connection errors
    pub async fn run(self) {
        loop {
            if let Err(e) = self.listen().await {
                error!(
                    channel = ADMIN_EVENTS_CHANNEL,
                    "Admin message listener failed: {}. Reconnecting in {:?}", e, RECONNECT_DELAY
                );
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn listen(&self) -> Result<(), sqlx::Error> {
        let mut listener = PgListener::connect_with(&self.db).await?;
        listener.listen(ADMIN_EVENTS_CHANNEL).await?;
        info!(channel = ADMIN_EVENTS_CHANNEL, "Listening for admin messages");

        loop {
            let notification = listener.recv().await?;
            let record = parse_event(notification.payload());
            self.notifier.on_message_created(&record).await;
        }
    }
}

/// Parse a trigger payload; malformed payloads become an empty record
pub fn parse_event(payload: &str) -> MessageRecord {
    let record = MessageRecord::from_payload(payload);
    if record.0.is_empty() && !payload.trim().is_empty() {
        warn!(payload_len = payload.len(), "Unparseable admin message payload");
    }
    record
}
