use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or empty required field
    #[error("{0}")]
    Validation(String),

    /// Nothing is registered, so there is nobody to send to
    #[error("No registered recipients to send to")]
    EmptyAudience,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Durable read/write failure
    #[error("Store error: {0}")]
    Store(String),

    /// A single-recipient send that the provider rejected
    #[error("Delivery failed: {0}")]
    Delivery(#[from] relay_fcm::SendFailure),

    #[error("Credential load failed: {0}")]
    CredentialLoad(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let code = self.status_code();
        let message = match self {
            AppError::Store(detail) => {
                tracing::error!(error = %detail, "Store failure");
                "Internal server error".to_string()
            }
            AppError::CredentialLoad(_) | AppError::Config(_) => {
                tracing::error!(error = %self, "Service misconfigured");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        HttpResponse::build(code).json(ErrorResponse {
            error: message,
            code: code.as_u16(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::EmptyAudience => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Delivery(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Store(err.to_string())
    }
}
