use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider-neutral push payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
    /// Custom key/value data; FCM requires string values
    pub data: Option<serde_json::Value>,
    pub android: Option<serde_json::Value>,
    pub apns: Option<serde_json::Value>,
}

impl PushNotification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    /// High-priority alert that opens `screen` when tapped in the Flutter client
    pub fn high_priority(title: impl Into<String>, body: impl Into<String>, screen: &str) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: Some(serde_json::json!({
                "click_action": "FLUTTER_NOTIFICATION_CLICK",
                "screen": screen,
            })),
            android: Some(serde_json::json!({
                "priority": "high",
                "notification": {
                    "channel_id": "high_importance_channel",
                    "sound": "default",
                    "default_vibrate_timings": true,
                },
            })),
            apns: Some(serde_json::json!({
                "payload": {
                    "aps": {
                        "sound": "default",
                        "content-available": 1,
                    },
                },
            })),
        }
    }
}

/// Successful provider acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message_id: String,
}

/// Typed reason a send was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// Token is no longer registered with the provider
    Unregistered,
    /// Malformed or unknown token
    InvalidArgument,
    /// Token belongs to a different sender project
    SenderIdMismatch,
    QuotaExceeded,
    /// Credentials, IAM role or project rejected; affects every token alike
    Misconfigured,
    Unavailable,
    Internal,
    Timeout,
    Other,
}

/// Whether a failed token may ever succeed again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureClass {
    Permanent,
    Transient,
}

impl FailureReason {
    /// Map an FCM v1 `details[].errorCode`.
    ///
    /// Only these codes speak about the individual token, so only they can
    /// yield a permanent reason.
    pub fn from_error_code(code: &str) -> Self {
        match code.to_uppercase().as_str() {
            "UNREGISTERED" => FailureReason::Unregistered,
            "INVALID_ARGUMENT" => FailureReason::InvalidArgument,
            "SENDER_ID_MISMATCH" => FailureReason::SenderIdMismatch,
            "QUOTA_EXCEEDED" => FailureReason::QuotaExceeded,
            "UNAVAILABLE" => FailureReason::Unavailable,
            "INTERNAL" => FailureReason::Internal,
            "THIRD_PARTY_AUTH_ERROR" => FailureReason::Misconfigured,
            _ => FailureReason::Other,
        }
    }

    /// Map a canonical `error.status` that came without an `errorCode`.
    /// A bare status describes the request or the project, never the token.
    pub fn from_status(status: &str) -> Self {
        match status.to_uppercase().as_str() {
            "PERMISSION_DENIED" | "UNAUTHENTICATED" | "NOT_FOUND" => FailureReason::Misconfigured,
            "RESOURCE_EXHAUSTED" => FailureReason::QuotaExceeded,
            "UNAVAILABLE" => FailureReason::Unavailable,
            "INTERNAL" => FailureReason::Internal,
            "DEADLINE_EXCEEDED" => FailureReason::Timeout,
            _ => FailureReason::Other,
        }
    }

    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 | 403 | 404 => FailureReason::Misconfigured,
            408 | 504 => FailureReason::Timeout,
            429 => FailureReason::QuotaExceeded,
            500 => FailureReason::Internal,
            502 | 503 => FailureReason::Unavailable,
            _ => FailureReason::Other,
        }
    }

    pub fn class(&self) -> FailureClass {
        match self {
            FailureReason::Unregistered
            | FailureReason::InvalidArgument
            | FailureReason::SenderIdMismatch => FailureClass::Permanent,
            _ => FailureClass::Transient,
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.class() == FailureClass::Permanent
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Unregistered => "unregistered",
            FailureReason::InvalidArgument => "invalid-argument",
            FailureReason::SenderIdMismatch => "sender-id-mismatch",
            FailureReason::QuotaExceeded => "quota-exceeded",
            FailureReason::Misconfigured => "misconfigured",
            FailureReason::Unavailable => "unavailable",
            FailureReason::Internal => "internal",
            FailureReason::Timeout => "timeout",
            FailureReason::Other => "other",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected send, with the provider's detail text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{reason}: {detail}")]
pub struct SendFailure {
    pub reason: FailureReason,
    pub detail: String,
}

impl SendFailure {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

/// Outcome of one token within a multicast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOutcome {
    pub token: String,
    pub result: Result<SendReceipt, SendFailure>,
}

impl TokenOutcome {
    pub fn delivered(token: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            result: Ok(SendReceipt {
                message_id: message_id.into(),
            }),
        }
    }

    pub fn failed(token: impl Into<String>, reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            result: Err(SendFailure::new(reason, detail)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        self.result.as_ref().err().map(|f| f.reason)
    }
}

/// Multicast send result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticastSendResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub outcomes: Vec<TokenOutcome>,
}

impl MulticastSendResult {
    pub fn from_outcomes(outcomes: Vec<TokenOutcome>) -> Self {
        let success_count = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            success_count,
            failure_count: outcomes.len() - success_count,
            outcomes,
        }
    }

    /// Every token failed with the same reason, e.g. the send never left the process
    pub fn all_failed(tokens: &[String], reason: FailureReason, detail: &str) -> Self {
        Self::from_outcomes(
            tokens
                .iter()
                .map(|t| TokenOutcome::failed(t.clone(), reason, detail))
                .collect(),
        )
    }
}

/// Firebase Service Account Key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    pub client_id: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// OAuth2 Token Cache
#[derive(Debug, Clone)]
pub(crate) struct TokenCache {
    pub access_token: String,
    pub expires_at: i64,
}

/// JWT Claims for Google OAuth2
#[derive(Debug, Serialize)]
pub(crate) struct JwtClaims {
    pub iss: String,
    pub sub: String,
    pub scope: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

/// Google OAuth2 Token Response
#[derive(Debug, Deserialize)]
pub(crate) struct GoogleTokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

/// FCM Message Request
#[derive(Debug, Serialize)]
pub(crate) struct FcmMessage {
    pub message: FcmMessageContent,
}

/// FCM Message Content
#[derive(Debug, Serialize)]
pub(crate) struct FcmMessageContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub notification: FcmNotification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<serde_json::Value>,
}

impl FcmMessageContent {
    pub fn to_token(token: &str, notification: &PushNotification) -> Self {
        Self::build(Some(token.to_string()), None, notification)
    }

    pub fn to_topic(topic: &str, notification: &PushNotification) -> Self {
        Self::build(None, Some(topic.to_string()), notification)
    }

    fn build(token: Option<String>, topic: Option<String>, n: &PushNotification) -> Self {
        Self {
            token,
            topic,
            notification: FcmNotification {
                title: n.title.clone(),
                body: n.body.clone(),
            },
            data: n.data.clone(),
            android: n.android.clone(),
            apns: n.apns.clone(),
        }
    }
}

/// FCM Notification Payload
#[derive(Debug, Serialize)]
pub(crate) struct FcmNotification {
    pub title: String,
    pub body: String,
}

/// FCM API Response
#[derive(Debug, Deserialize)]
pub(crate) struct FcmApiResponse {
    pub name: Option<String>,
}

/// FCM error envelope (`{"error": {...}}`)
#[derive(Debug, Deserialize)]
pub(crate) struct FcmErrorEnvelope {
    pub error: FcmErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FcmErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub details: Vec<FcmErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FcmErrorDetail {
    #[serde(rename = "errorCode", default)]
    pub error_code: Option<String>,
}

/// Turn a non-2xx FCM response into a typed failure.
///
/// Precedence: `details[].errorCode`, then `status`, then the HTTP status.
pub fn classify_error_response(http_status: u16, body: &str) -> SendFailure {
    let parsed = serde_json::from_str::<FcmErrorEnvelope>(body).ok();

    let error_code = parsed.as_ref().and_then(|env| {
        env.error
            .details
            .iter()
            .find_map(|d| d.error_code.as_deref())
            .map(FailureReason::from_error_code)
    });
    let status = parsed
        .as_ref()
        .and_then(|env| env.error.status.as_deref())
        .map(FailureReason::from_status);

    let reason = error_code
        .filter(|r| *r != FailureReason::Other)
        .or(status.filter(|r| *r != FailureReason::Other))
        .unwrap_or_else(|| FailureReason::from_http_status(http_status));

    let detail = parsed
        .and_then(|env| env.error.message)
        .unwrap_or_else(|| format!("FCM API error: {} - {}", http_status, body));

    SendFailure::new(reason, detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_unregistered_from_details() {
        let body = r#"{
            "error": {
                "code": 404,
                "message": "Requested entity was not found.",
                "status": "NOT_FOUND",
                "details": [{
                    "@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError",
                    "errorCode": "UNREGISTERED"
                }]
            }
        }"#;

        let failure = classify_error_response(404, body);
        assert_eq!(failure.reason, FailureReason::Unregistered);
        assert_eq!(failure.detail, "Requested entity was not found.");
        assert!(failure.reason.is_permanent());
    }

    #[test]
    fn test_classify_falls_back_to_status_then_http() {
        let body = r#"{"error": {"code": 503, "message": "busy", "status": "UNAVAILABLE"}}"#;
        assert_eq!(
            classify_error_response(503, body).reason,
            FailureReason::Unavailable
        );

        let failure = classify_error_response(429, "<html>slow down</html>");
        assert_eq!(failure.reason, FailureReason::QuotaExceeded);
        assert!(failure.detail.contains("429"));
    }

    #[test]
    fn test_missing_iam_role_is_not_permanent() {
        let body = r#"{
            "error": {
                "code": 403,
                "message": "Permission 'cloudmessaging.messages.create' denied on resource",
                "status": "PERMISSION_DENIED"
            }
        }"#;

        let failure = classify_error_response(403, body);
        assert_eq!(failure.reason, FailureReason::Misconfigured);
        assert!(!failure.reason.is_permanent());
    }

    #[test]
    fn test_unknown_project_is_not_permanent() {
        let body = r#"{"error": {"code": 404, "status": "NOT_FOUND"}}"#;

        let failure = classify_error_response(404, body);
        assert_eq!(failure.reason, FailureReason::Misconfigured);
        assert!(!failure.reason.is_permanent());
    }

    #[test]
    fn test_bare_http_statuses_are_never_permanent() {
        for status in [400, 401, 403, 404, 500, 503] {
            let failure = classify_error_response(status, "");
            assert!(!failure.reason.is_permanent(), "{status} -> {}", failure.reason);
        }
    }

    #[test]
    fn test_invalid_argument_needs_error_code() {
        let bare = r#"{"error": {"code": 400, "message": "bad payload", "status": "INVALID_ARGUMENT"}}"#;
        assert!(!classify_error_response(400, bare).reason.is_permanent());

        let with_code = r#"{
            "error": {
                "code": 400,
                "message": "The registration token is not a valid FCM registration token",
                "status": "INVALID_ARGUMENT",
                "details": [{"errorCode": "INVALID_ARGUMENT"}]
            }
        }"#;
        assert_eq!(
            classify_error_response(400, with_code).reason,
            FailureReason::InvalidArgument
        );
    }

    #[test]
    fn test_failure_classes() {
        for reason in [
            FailureReason::Unregistered,
            FailureReason::InvalidArgument,
            FailureReason::SenderIdMismatch,
        ] {
            assert_eq!(reason.class(), FailureClass::Permanent, "{reason}");
        }

        for reason in [
            FailureReason::QuotaExceeded,
            FailureReason::Misconfigured,
            FailureReason::Unavailable,
            FailureReason::Internal,
            FailureReason::Timeout,
            FailureReason::Other,
        ] {
            assert_eq!(reason.class(), FailureClass::Transient, "{reason}");
        }
    }

    #[test]
    fn test_multicast_counts_from_outcomes() {
        let result = MulticastSendResult::from_outcomes(vec![
            TokenOutcome::delivered("tok-a", "projects/p/messages/1"),
            TokenOutcome::failed("tok-b", FailureReason::Unregistered, "gone"),
            TokenOutcome::failed("tok-c", FailureReason::Unavailable, "retry"),
        ]);

        assert_eq!(result.success_count, 1);
        assert_eq!(result.failure_count, 2);
        assert_eq!(result.outcomes.len(), 3);
    }

    #[test]
    fn test_topic_message_omits_token() {
        let content = FcmMessageContent::to_topic(
            "admin_messages_topic",
            &PushNotification::new("Admin", "Hi all"),
        );
        let json = serde_json::to_value(FcmMessage { message: content }).unwrap();

        assert_eq!(json["message"]["topic"], "admin_messages_topic");
        assert!(json["message"].get("token").is_none());
        assert_eq!(json["message"]["notification"]["title"], "Admin");
    }

    #[test]
    fn test_high_priority_preset() {
        let n = PushNotification::high_priority("Hello", "World", "login");
        let data = n.data.unwrap();
        assert_eq!(data["click_action"], "FLUTTER_NOTIFICATION_CLICK");
        assert_eq!(data["screen"], "login");
        assert_eq!(n.android.unwrap()["notification"]["channel_id"], "high_importance_channel");
    }
}
