/// Token registration
///
/// `register_token` only writes the registry. Sending anything to the device
/// is a separate, explicit call (`notify_welcome`), so retried registrations
/// stay idempotent.
use relay_fcm::{DynPushProvider, PushNotification, SendReceipt};
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{RecipientRecord, RegistrationOutcome};
use crate::store::{validate_registration, DynRegistryStore};

pub const WELCOME_TITLE: &str = "Login Successful 🎉";
pub const WELCOME_BODY: &str = "You have successfully logged in from the server!";

pub struct TokenRegistrar {
    store: DynRegistryStore,
    provider: DynPushProvider,
}

impl TokenRegistrar {
    pub fn new(store: DynRegistryStore, provider: DynPushProvider) -> Self {
        Self { store, provider }
    }

    /// Record `token` as the current token for `recipient_id`
    pub async fn register_token(
        &self,
        recipient_id: &str,
        token: &str,
    ) -> Result<RegistrationOutcome> {
        validate_registration(recipient_id, token)?;

        self.store.upsert(recipient_id, token).await?;
        metrics::record_registration();

        info!(
            recipient_id,
            token_prefix = %token_prefix(token),
            "Registered device token"
        );

        Ok(RegistrationOutcome {
            recipient_id: recipient_id.to_string(),
            token: token.to_string(),
        })
    }

    pub async fn list_recipients(&self) -> Result<Vec<RecipientRecord>> {
        self.store.list_all().await
    }

    /// Send the login welcome push to a registered recipient
    pub async fn notify_welcome(&self, recipient_id: &str) -> Result<SendReceipt> {
        if recipient_id.is_empty() {
            return Err(AppError::validation("recipientId is required"));
        }

        let record = self
            .store
            .get(recipient_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("recipient {}", recipient_id)))?;

        let notification = PushNotification::high_priority(WELCOME_TITLE, WELCOME_BODY, "login");

        match self.provider.send(&record.token, &notification).await {
            Ok(receipt) => {
                info!(recipient_id, message_id = %receipt.message_id, "Welcome notification sent");
                Ok(receipt)
            }
            Err(failure) => {
                warn!(recipient_id, reason = %failure.reason, "Welcome notification failed: {}", failure.detail);
                Err(AppError::Delivery(failure))
            }
        }
    }
}

/// First characters of a token, safe for logs
pub(crate) fn token_prefix(token: &str) -> String {
    token.chars().take(8).collect()
}
