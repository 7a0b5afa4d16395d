/// Operator broadcast handlers
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::services::BroadcastDispatcher;

/// Broadcast request
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct BroadcastPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecentMessagesQuery {
    pub limit: Option<i64>,
}

/// Send a notification to every registered recipient
///
/// POST /admin/send
pub async fn send_broadcast(
    dispatcher: web::Data<Arc<BroadcastDispatcher>>,
    req: web::Json<BroadcastPayload>,
) -> Result<HttpResponse> {
    let title = req.title.as_deref().unwrap_or_default();
    let body = req.message.as_deref().unwrap_or_default();

    let result = dispatcher.broadcast(title, body).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "sent": result.success_count,
        "failed": result.failure_count,
    })))
}

/// Recent broadcast audit records
///
/// GET /admin/messages?limit=N
pub async fn recent_messages(
    dispatcher: web::Data<Arc<BroadcastDispatcher>>,
    query: web::Query<RecentMessagesQuery>,
) -> Result<HttpResponse> {
    let messages = dispatcher
        .recent_messages(query.limit.unwrap_or(50))
        .await?;
    Ok(HttpResponse::Ok().json(messages))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/send", web::post().to(send_broadcast))
            .route("/messages", web::get().to(recent_messages)),
    );
}
