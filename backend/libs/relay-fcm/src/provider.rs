use std::sync::Arc;

use crate::models::{MulticastSendResult, PushNotification, SendFailure, SendReceipt};

/// Trait for push notification providers
///
/// Implementations own transport, authentication and per-token error
/// mapping. Callers only see typed outcomes.
#[async_trait::async_trait]
pub trait PushProvider: Send + Sync {
    /// Sends a notification to a single device token
    async fn send(
        &self,
        token: &str,
        notification: &PushNotification,
    ) -> Result<SendReceipt, SendFailure>;

    /// Sends one notification to many tokens.
    ///
    /// Never fails as a whole: the result holds exactly one outcome per
    /// input token, in no particular order.
    async fn send_multicast(
        &self,
        tokens: &[String],
        notification: &PushNotification,
    ) -> MulticastSendResult;

    /// Publishes to every device subscribed to `topic`
    async fn send_to_topic(
        &self,
        topic: &str,
        notification: &PushNotification,
    ) -> Result<SendReceipt, SendFailure>;
}

/// Shared trait object used by services
pub type DynPushProvider = Arc<dyn PushProvider>;
