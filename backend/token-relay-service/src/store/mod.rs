/// Durable storage behind the registrar and dispatcher
///
/// Services depend on these traits, never on a concrete backend. The
/// PostgreSQL implementations in `postgres` are the only ones shipped.
pub mod postgres;

use crate::error::{AppError, Result};
use crate::models::{BroadcastMessage, RecipientRecord};
use async_trait::async_trait;
use std::sync::Arc;

pub use postgres::{PgMessageLog, PgRegistryStore};

/// Recipient → token registry
///
/// Implementations must make `upsert`, `remove` and `remove_by_token` atomic; no other
/// locking is expected from callers.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Insert or replace the token for `recipient_id` (last write wins)
    async fn upsert(&self, recipient_id: &str, token: &str) -> Result<()>;

    /// Snapshot of every record. Order is unspecified.
    async fn list_all(&self) -> Result<Vec<RecipientRecord>>;

    async fn get(&self, recipient_id: &str) -> Result<Option<RecipientRecord>>;

    /// Idempotent: removing an unknown id is not an error
    async fn remove(&self, recipient_id: &str) -> Result<()>;

    /// Remove every record whose current token is `token` and return the
    /// removed ids. Lookup and delete are one atomic step, so a recipient
    /// that re-registered with a new token is never touched.
    async fn remove_by_token(&self, token: &str) -> Result<Vec<String>>;
}

/// Append-only broadcast audit log
#[async_trait]
pub trait MessageLog: Send + Sync {
    async fn record(
        &self,
        title: &str,
        body: &str,
        success_count: usize,
        failure_count: usize,
    ) -> Result<BroadcastMessage>;

    /// Newest first
    async fn list_recent(&self, limit: i64) -> Result<Vec<BroadcastMessage>>;
}

pub type DynRegistryStore = Arc<dyn RegistryStore>;
pub type DynMessageLog = Arc<dyn MessageLog>;

/// Shared key validation for every `RegistryStore` implementation
pub fn validate_registration(recipient_id: &str, token: &str) -> Result<()> {
    if recipient_id.is_empty() {
        return Err(AppError::validation("recipientId is required"));
    }
    if token.is_empty() {
        return Err(AppError::validation("token is required"));
    }
    Ok(())
}
