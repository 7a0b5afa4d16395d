/// Broadcast to every registered recipient
///
/// Flow: validate → snapshot the registry → dedupe tokens → one multicast
/// (bounded by a timeout) → audit record → prune dead tokens.
///
/// No registry-wide lock is held while the provider call is in flight;
/// registrations that land mid-broadcast may or may not be included.
use relay_fcm::{DynPushProvider, FailureReason, MulticastSendResult, PushNotification};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

use super::delivery_reconciler::DeliveryReconciler;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{BroadcastMessage, DispatchResult, RecipientRecord};
use crate::store::{DynMessageLog, DynRegistryStore};

pub struct BroadcastDispatcher {
    store: DynRegistryStore,
    log: DynMessageLog,
    provider: DynPushProvider,
    reconciler: DeliveryReconciler,
    send_timeout: Duration,
}

impl BroadcastDispatcher {
    pub fn new(
        store: DynRegistryStore,
        log: DynMessageLog,
        provider: DynPushProvider,
        send_timeout: Duration,
    ) -> Self {
        Self {
            reconciler: DeliveryReconciler::new(store.clone()),
            store,
            log,
            provider,
            send_timeout,
        }
    }

    /// Send `title`/`body` to every registered recipient.
    ///
    /// Partial delivery failure is a normal outcome and is reported through
    /// the counts, never as an error.
    pub async fn broadcast(&self, title: &str, body: &str) -> Result<DispatchResult> {
        if title.is_empty() {
            return Err(AppError::validation("title is required"));
        }
        if body.is_empty() {
            return Err(AppError::validation("message is required"));
        }

        let recipients = self.store.list_all().await?;
        if recipients.is_empty() {
            return Err(AppError::EmptyAudience);
        }

        let tokens = distinct_tokens(&recipients);
        info!(
            recipients = recipients.len(),
            tokens = tokens.len(),
            "Dispatching broadcast"
        );

        let notification = PushNotification::high_priority(title, body, "admin");
        let sent = self.send_with_timeout(&tokens, &notification).await;

        let audit = self
            .log
            .record(title, body, sent.success_count, sent.failure_count)
            .await;
        metrics::record_broadcast(sent.success_count, sent.failure_count);

        // The send already happened; dead tokens are pruned even if the
        // audit write failed.
        let invalid_tokens = DeliveryReconciler::permanent_failures(&sent.outcomes);
        let pruned_recipients = self.reconciler.reconcile(&sent.outcomes).await;
        audit?;

        info!(
            sent = sent.success_count,
            failed = sent.failure_count,
            pruned = pruned_recipients.len(),
            "Broadcast complete"
        );

        Ok(DispatchResult {
            success_count: sent.success_count,
            failure_count: sent.failure_count,
            invalid_tokens,
            pruned_recipients,
        })
    }

    /// Recent audit records, newest first
    pub async fn recent_messages(&self, limit: i64) -> Result<Vec<BroadcastMessage>> {
        self.log.list_recent(limit.clamp(1, 500)).await
    }

    async fn send_with_timeout(
        &self,
        tokens: &[String],
        notification: &PushNotification,
    ) -> MulticastSendResult {
        match tokio::time::timeout(
            self.send_timeout,
            self.provider.send_multicast(tokens, notification),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    timeout_secs = self.send_timeout.as_secs(),
                    tokens = tokens.len(),
                    "Multicast send timed out"
                );
                MulticastSendResult::all_failed(
                    tokens,
                    FailureReason::Timeout,
                    "multicast send timed out",
                )
            }
        }
    }
}

/// Distinct tokens across `recipients`, in first-seen order
pub fn distinct_tokens(recipients: &[RecipientRecord]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(recipients.len());
    recipients
        .iter()
        .filter(|r| seen.insert(r.token.as_str()))
        .map(|r| r.token.clone())
        .collect()
}
