use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::FcmError;
use crate::models::*;
use crate::provider::PushProvider;

const FCM_BASE_URL: &str = "https://fcm.googleapis.com";
const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Tunables for `FcmClient`
#[derive(Debug, Clone)]
pub struct FcmClientOptions {
    /// Per-request HTTP timeout
    pub request_timeout: std::time::Duration,
    /// Maximum in-flight sends during a multicast
    pub multicast_concurrency: usize,
    /// Override for the FCM endpoint (tests, emulators)
    pub base_url: String,
}

impl Default for FcmClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: std::time::Duration::from_secs(10),
            multicast_concurrency: 16,
            base_url: FCM_BASE_URL.to_string(),
        }
    }
}

/// Firebase Cloud Messaging Client
///
/// Handles Firebase Cloud Messaging (FCM) HTTP v1 delivery for Android, iOS
/// and Web installations. Manages OAuth2 token generation, caching, and
/// message delivery.
pub struct FcmClient {
    pub project_id: String,
    credentials: Arc<ServiceAccountKey>,
    encoding_key: EncodingKey,
    token_cache: Arc<RwLock<Option<TokenCache>>>,
    http_client: reqwest::Client,
    options: FcmClientOptions,
}

impl FcmClient {
    /// Create new FCM client
    ///
    /// # Arguments
    /// * `project_id` - Firebase project ID
    /// * `credentials` - Service account key with OAuth2 credentials
    /// * `options` - HTTP timeout, multicast fan-out and endpoint
    ///
    /// Fails with `FcmError::KeyParse` when the private key is not a usable
    /// RSA PEM, so a corrupt key never reaches the first send.
    pub fn new(
        project_id: String,
        credentials: ServiceAccountKey,
        options: FcmClientOptions,
    ) -> Result<Self, FcmError> {
        let encoding_key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
            .map_err(|e| FcmError::KeyParse(e.to_string()))?;

        let http_client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| FcmError::HttpClient(e.to_string()))?;

        Ok(Self {
            project_id,
            credentials: Arc::new(credentials),
            encoding_key,
            token_cache: Arc::new(RwLock::new(None)),
            http_client,
            options,
        })
    }

    fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.options.base_url.trim_end_matches('/'),
            self.project_id
        )
    }

    async fn post_message(&self, content: FcmMessageContent) -> Result<SendReceipt, SendFailure> {
        let access_token = self.get_access_token().await?;

        let response = self
            .http_client
            .post(self.send_url())
            .bearer_auth(access_token)
            .json(&FcmMessage { message: content })
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    FailureReason::Timeout
                } else {
                    FailureReason::Unavailable
                };
                SendFailure::new(reason, format!("FCM send request failed: {}", e))
            })?;

        let status = response.status();
        if status.is_success() {
            let fcm_response: FcmApiResponse = response.json().await.map_err(|e| {
                SendFailure::new(
                    FailureReason::Internal,
                    format!("Failed to parse FCM response: {}", e),
                )
            })?;

            return Ok(SendReceipt {
                message_id: fcm_response
                    .name
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
            });
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(classify_error_response(status.as_u16(), &error_text))
    }

    /// Get access token from service account (with caching)
    pub async fn get_access_token(&self) -> Result<String, FcmError> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                // Still valid for at least 60 more seconds
                if cached.expires_at > Utc::now().timestamp() + 60 {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let assertion = self.signed_assertion()?;

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.credentials.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| FcmError::TokenRequest(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FcmError::TokenRequestFailed(response.status().as_u16()));
        }

        let token_response: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|e| FcmError::TokenParse(e.to_string()))?;

        let expires_at = Utc::now().timestamp() + token_response.expires_in;
        *self.token_cache.write().await = Some(TokenCache {
            access_token: token_response.access_token.clone(),
            expires_at,
        });
        debug!(project_id = %self.project_id, "Refreshed FCM access token");

        Ok(token_response.access_token)
    }

    /// Self-signed RS256 JWT exchanged for an OAuth2 access token
    fn signed_assertion(&self) -> Result<String, FcmError> {
        let now = Utc::now();
        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            sub: self.credentials.client_email.clone(),
            scope: FCM_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.credentials.private_key_id.clone());

        encode(&header, &claims, &self.encoding_key).map_err(|e| FcmError::JwtEncode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl PushProvider for FcmClient {
    async fn send(
        &self,
        token: &str,
        notification: &PushNotification,
    ) -> Result<SendReceipt, SendFailure> {
        self.post_message(FcmMessageContent::to_token(token, notification))
            .await
    }

    async fn send_multicast(
        &self,
        tokens: &[String],
        notification: &PushNotification,
    ) -> MulticastSendResult {
        if tokens.is_empty() {
            return MulticastSendResult::from_outcomes(Vec::new());
        }

        // Fetch once up front so the fan-out does not race N token refreshes
        if let Err(e) = self.get_access_token().await {
            warn!(error = %e, tokens = tokens.len(), "FCM credentials unavailable for multicast");
            let failure = SendFailure::from(e);
            return MulticastSendResult::all_failed(tokens, failure.reason, &failure.detail);
        }

        let outcomes = stream::iter(tokens.iter().cloned())
            .map(|token| async move {
                let result = self.send(&token, notification).await;
                TokenOutcome { token, result }
            })
            .buffer_unordered(self.options.multicast_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        MulticastSendResult::from_outcomes(outcomes)
    }

    async fn send_to_topic(
        &self,
        topic: &str,
        notification: &PushNotification,
    ) -> Result<SendReceipt, SendFailure> {
        self.post_message(FcmMessageContent::to_topic(topic, notification))
            .await
    }
}
