use thiserror::Error;

use crate::models::{FailureReason, SendFailure};

/// FCM Client Error Types
#[derive(Error, Debug)]
pub enum FcmError {
    #[error("Failed to parse private key: {0}")]
    KeyParse(String),

    #[error("Failed to encode JWT: {0}")]
    JwtEncode(String),

    #[error("Failed to get access token: {0}")]
    TokenRequest(String),

    #[error("Token request failed with status: {0}")]
    TokenRequestFailed(u16),

    #[error("Failed to parse token response: {0}")]
    TokenParse(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl From<FcmError> for SendFailure {
    fn from(err: FcmError) -> Self {
        // Credential problems are not the device's fault; nothing here should
        // cause a registered token to be pruned.
        let reason = match &err {
            FcmError::TokenRequest(_) | FcmError::TokenRequestFailed(_) => {
                FailureReason::Unavailable
            }
            _ => FailureReason::Internal,
        };
        SendFailure::new(reason, err.to_string())
    }
}
