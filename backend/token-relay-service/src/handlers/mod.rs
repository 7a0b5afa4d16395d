/// HTTP handlers for the token relay API
pub mod broadcast;
pub mod tokens;

use actix_web::{
    error::{JsonPayloadError, QueryPayloadError},
    web, HttpRequest, HttpResponse,
};

use crate::error::AppError;
use crate::metrics;

pub use broadcast::{recent_messages, send_broadcast};
pub use tokens::{list_tokens, notify_welcome, register_token};

/// Malformed JSON bodies become `400 {error}` like every other client error
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
            AppError::validation(format!("Invalid JSON body: {}", err)).into()
        })
}

/// Unparseable query strings get the same `400 {error}` body
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: QueryPayloadError, _req: &HttpRequest| {
        AppError::validation(format!("Invalid query string: {}", err)).into()
    })
}

/// Every route the service exposes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .route("/", web::get().to(|| async { "Token relay is running" }))
        .route("/health", web::get().to(|| async { HttpResponse::Ok().body("OK") }))
        .route("/metrics", web::get().to(metrics::serve_metrics))
        .configure(tokens::register_routes)
        .configure(broadcast::register_routes);
}
