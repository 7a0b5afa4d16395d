#![allow(dead_code)]
/// Shared fixtures for token-relay-service integration tests
///
/// - In-memory `RegistryStore` / `MessageLog` doubles with failure injection
/// - A mockall `PushProvider` mock
/// - Outcome helpers for scripting multicast results
use async_trait::async_trait;
use chrono::Utc;
use mockall::mock;
use relay_fcm::{
    FailureReason, MulticastSendResult, PushNotification, PushProvider, SendFailure, SendReceipt,
    TokenOutcome,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use token_relay_service::models::{BroadcastMessage, RecipientRecord};
use token_relay_service::store::{validate_registration, MessageLog, RegistryStore};
use token_relay_service::{AppError, Result};

mock! {
    pub Provider {}

    #[async_trait]
    impl PushProvider for Provider {
        async fn send(
            &self,
            token: &str,
            notification: &PushNotification,
        ) -> std::result::Result<SendReceipt, SendFailure>;

        async fn send_multicast(
            &self,
            tokens: &[String],
            notification: &PushNotification,
        ) -> MulticastSendResult;

        async fn send_to_topic(
            &self,
            topic: &str,
            notification: &PushNotification,
        ) -> std::result::Result<SendReceipt, SendFailure>;
    }
}

/// In-memory registry used only by tests
#[derive(Default)]
pub struct InMemoryRegistryStore {
    records: RwLock<HashMap<String, RecipientRecord>>,
    fail: AtomicBool,
}

impl InMemoryRegistryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every subsequent call return a store error
    pub fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Store("connection refused".to_string()));
        }
        Ok(())
    }

    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl RegistryStore for InMemoryRegistryStore {
    async fn upsert(&self, recipient_id: &str, token: &str) -> Result<()> {
        self.check()?;
        validate_registration(recipient_id, token)?;
        self.records.write().await.insert(
            recipient_id.to_string(),
            RecipientRecord {
                recipient_id: recipient_id.to_string(),
                token: token.to_string(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<RecipientRecord>> {
        self.check()?;
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn get(&self, recipient_id: &str) -> Result<Option<RecipientRecord>> {
        self.check()?;
        Ok(self.records.read().await.get(recipient_id).cloned())
    }

    async fn remove(&self, recipient_id: &str) -> Result<()> {
        self.check()?;
        self.records.write().await.remove(recipient_id);
        Ok(())
    }

    async fn remove_by_token(&self, token: &str) -> Result<Vec<String>> {
        self.check()?;
        let mut records = self.records.write().await;
        let mut removed: Vec<String> = records
            .values()
            .filter(|r| r.token == token)
            .map(|r| r.recipient_id.clone())
            .collect();
        removed.sort();
        records.retain(|_, r| r.token != token);
        Ok(removed)
    }
}

/// In-memory audit log used only by tests
#[derive(Default)]
pub struct InMemoryMessageLog {
    messages: RwLock<Vec<BroadcastMessage>>,
    fail: AtomicBool,
}

impl InMemoryMessageLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub async fn all(&self) -> Vec<BroadcastMessage> {
        self.messages.read().await.clone()
    }
}

#[async_trait]
impl MessageLog for InMemoryMessageLog {
    async fn record(
        &self,
        title: &str,
        body: &str,
        success_count: usize,
        failure_count: usize,
    ) -> Result<BroadcastMessage> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Store("disk full".to_string()));
        }
        let message = BroadcastMessage {
            id: Uuid::new_v4(),
            title: title.to_string(),
            body: body.to_string(),
            success_count: success_count as i32,
            failure_count: failure_count as i32,
            created_at: Utc::now(),
        };
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<BroadcastMessage>> {
        let messages = self.messages.read().await;
        Ok(messages
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

/// Multicast result with one outcome per token; tokens not listed in
/// `failures` succeed.
pub fn outcomes_for(
    tokens: &[String],
    failures: &HashMap<String, FailureReason>,
) -> MulticastSendResult {
    MulticastSendResult::from_outcomes(
        tokens
            .iter()
            .map(|t| match failures.get(t) {
                Some(reason) => TokenOutcome::failed(t.clone(), *reason, reason.as_str()),
                None => TokenOutcome::delivered(t.clone(), format!("projects/demo/messages/{}", t)),
            })
            .collect(),
    )
}

/// Provider whose multicast reports the given per-token failures
pub fn provider_failing(failures: &[(&str, FailureReason)]) -> MockProvider {
    let failures: HashMap<String, FailureReason> = failures
        .iter()
        .map(|(t, r)| (t.to_string(), *r))
        .collect();

    let mut provider = MockProvider::new();
    provider
        .expect_send_multicast()
        .times(1)
        .returning(move |tokens, _| outcomes_for(tokens, &failures));
    provider
}

pub fn receipt(id: &str) -> SendReceipt {
    SendReceipt {
        message_id: id.to_string(),
    }
}
