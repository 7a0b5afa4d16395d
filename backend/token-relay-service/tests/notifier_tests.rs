/// Tests for the admin message → topic notifier
mod common;

use common::{receipt, MockProvider};
use relay_fcm::{FailureReason, SendFailure};
use serde_json::json;
use std::sync::Arc;
use token_relay_service::models::MessageRecord;
use token_relay_service::{parse_event, MessageNotifier, MESSAGE_FIELD_DEFAULTS};

const TOPIC: &str = "admin_messages_topic";

fn expect_topic_publish(title: &'static str, body: &'static str) -> MockProvider {
    let mut provider = MockProvider::new();
    provider.expect_send().never();
    provider.expect_send_multicast().never();
    provider
        .expect_send_to_topic()
        .withf(move |topic, n| topic == TOPIC && n.title == title && n.body == body)
        .times(1)
        .returning(|_, _| Ok(receipt("projects/demo/messages/42")));
    provider
}

#[tokio::test]
async fn test_publishes_sender_and_message() {
    let notifier = MessageNotifier::new(Arc::new(expect_topic_publish("Admin", "Hi all")), TOPIC);

    notifier
        .on_message_created(&MessageRecord::from(json!({
            "senderName": "Admin",
            "message": "Hi all",
        })))
        .await;
}

#[tokio::test]
async fn test_empty_record_uses_defaults() {
    let notifier = MessageNotifier::new(
        Arc::new(expect_topic_publish("New Message", "You have a new message.")),
        TOPIC,
    );

    notifier.on_message_created(&MessageRecord::default()).await;
}

#[tokio::test]
async fn test_trigger_payload_end_to_end() {
    let notifier = MessageNotifier::new(
        Arc::new(expect_topic_publish("Ops", "Maintenance tonight")),
        TOPIC,
    );

    let record = parse_event(
        r#"{"id":"2f0d8b8e-1b7a-4c4e-8d7e-6a8f1e2b3c4d","sender_name":"Ops","message":"Maintenance tonight","created_at":"2025-03-01T12:00:00+00:00"}"#,
    );
    notifier.on_message_created(&record).await;
}

#[tokio::test]
async fn test_delivery_failure_is_swallowed() {
    let mut provider = MockProvider::new();
    provider.expect_send_to_topic().times(1).returning(|_, _| {
        Err(SendFailure::new(FailureReason::Unavailable, "backend unavailable"))
    });

    let notifier = MessageNotifier::new(Arc::new(provider), TOPIC);

    // Returns normally; nothing propagates to the event source
    notifier
        .on_message_created(&MessageRecord::from(json!({ "message": "hello" })))
        .await;
}

#[test]
fn test_defaults_table_is_enumerable() {
    let defaults: Vec<&str> = MESSAGE_FIELD_DEFAULTS.iter().map(|d| d.default).collect();
    assert_eq!(defaults, vec!["New Message", "You have a new message."]);
}
