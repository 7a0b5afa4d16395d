use relay_fcm::{FailureClass, TokenOutcome};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use super::token_registrar::token_prefix;
use crate::metrics;
use crate::store::DynRegistryStore;

/// Prunes the registry of tokens the provider will never accept again.
///
/// Transient failures are left alone; retrying them is not this type's job.
pub struct DeliveryReconciler {
    store: DynRegistryStore,
}

impl DeliveryReconciler {
    pub fn new(store: DynRegistryStore) -> Self {
        Self { store }
    }

    /// Tokens in `outcomes` that failed permanently
    pub fn permanent_failures(outcomes: &[TokenOutcome]) -> BTreeSet<String> {
        outcomes
            .iter()
            .filter(|o| {
                o.failure_reason()
                    .map(|r| r.class() == FailureClass::Permanent)
                    .unwrap_or(false)
            })
            .map(|o| o.token.clone())
            .collect()
    }

    /// Remove every recipient whose token failed permanently.
    ///
    /// Returns the removed recipient ids. The delete is conditional on the
    /// dead token, so a recipient that re-registered in the meantime keeps
    /// its new token. Store errors are logged and skipped; the next broadcast
    /// will see the token again.
    pub async fn reconcile(&self, outcomes: &[TokenOutcome]) -> BTreeSet<String> {
        let mut removed = BTreeSet::new();

        for token in Self::permanent_failures(outcomes) {
            match self.store.remove_by_token(&token).await {
                Ok(owners) if owners.is_empty() => {
                    debug!(token_prefix = %token_prefix(&token), "Dead token has no owner, skipping");
                }
                Ok(owners) => removed.extend(owners),
                Err(e) => {
                    warn!(token_prefix = %token_prefix(&token), "Failed to prune dead token: {}", e);
                }
            }
        }

        if !removed.is_empty() {
            info!(count = removed.len(), "Pruned recipients with dead tokens");
            metrics::record_pruned(removed.len());
        }

        removed
    }
}
