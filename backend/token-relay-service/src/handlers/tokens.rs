/// Device token handlers
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::services::TokenRegistrar;

/// Register device token request
///
/// Fields are optional at the extractor so that a missing field reaches the
/// registrar and is reported as a validation error.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTokenPayload {
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Welcome notification request
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NotifyWelcomePayload {
    #[serde(default)]
    pub recipient_id: Option<String>,
}

/// Register a device token
///
/// POST /register-token
pub async fn register_token(
    registrar: web::Data<Arc<TokenRegistrar>>,
    req: web::Json<RegisterTokenPayload>,
) -> Result<HttpResponse> {
    let recipient_id = req.recipient_id.as_deref().unwrap_or_default();
    let token = req.token.as_deref().unwrap_or_default();

    registrar.register_token(recipient_id, token).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

/// List registered recipients
///
/// GET /tokens
pub async fn list_tokens(registrar: web::Data<Arc<TokenRegistrar>>) -> Result<HttpResponse> {
    let records = registrar.list_recipients().await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Send the welcome notification to one recipient
///
/// POST /notify-welcome
pub async fn notify_welcome(
    registrar: web::Data<Arc<TokenRegistrar>>,
    req: web::Json<NotifyWelcomePayload>,
) -> Result<HttpResponse> {
    let recipient_id = req.recipient_id.as_deref().unwrap_or_default();
    let receipt = registrar.notify_welcome(recipient_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "messageId": receipt.message_id,
    })))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/register-token", web::post().to(register_token))
        .route("/tokens", web::get().to(list_tokens))
        .route("/notify-welcome", web::post().to(notify_welcome));
}
