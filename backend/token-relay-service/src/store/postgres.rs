use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, error};
use uuid::Uuid;

use super::{validate_registration, MessageLog, RegistryStore};
use crate::error::{AppError, Result};
use crate::models::{BroadcastMessage, RecipientRecord};

/// `RegistryStore` over the `recipient_tokens` table
#[derive(Clone)]
pub struct PgRegistryStore {
    db: PgPool,
}

impl PgRegistryStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn recipient_from_row(row: &PgRow) -> RecipientRecord {
    RecipientRecord {
        recipient_id: row.get("recipient_id"),
        token: row.get("token"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl RegistryStore for PgRegistryStore {
    async fn upsert(&self, recipient_id: &str, token: &str) -> Result<()> {
        validate_registration(recipient_id, token)?;

        // Single statement, so concurrent writers for one id never interleave
        let query = r#"
            INSERT INTO recipient_tokens (recipient_id, token, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (recipient_id) DO UPDATE
            SET token = EXCLUDED.token, updated_at = EXCLUDED.updated_at
        "#;

        sqlx::query(query)
            .bind(recipient_id)
            .bind(token)
            .execute(&self.db)
            .await
            .map_err(|e| {
                error!(recipient_id, "Failed to upsert recipient token: {}", e);
                AppError::from(e)
            })?;

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<RecipientRecord>> {
        let rows = sqlx::query("SELECT recipient_id, token, updated_at FROM recipient_tokens")
            .fetch_all(&self.db)
            .await?;

        Ok(rows.iter().map(recipient_from_row).collect())
    }

    async fn get(&self, recipient_id: &str) -> Result<Option<RecipientRecord>> {
        let row = sqlx::query(
            "SELECT recipient_id, token, updated_at FROM recipient_tokens WHERE recipient_id = $1",
        )
        .bind(recipient_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.as_ref().map(recipient_from_row))
    }

    async fn remove(&self, recipient_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM recipient_tokens WHERE recipient_id = $1")
            .bind(recipient_id)
            .execute(&self.db)
            .await?;

        debug!(
            recipient_id,
            removed = result.rows_affected(),
            "Removed recipient token"
        );
        Ok(())
    }

    async fn remove_by_token(&self, token: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "DELETE FROM recipient_tokens WHERE token = $1 RETURNING recipient_id",
        )
        .bind(token)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.iter().map(|row| row.get::<String, _>("recipient_id")).collect())
    }
}

/// `MessageLog` over the `broadcast_messages` table
#[derive(Clone)]
pub struct PgMessageLog {
    db: PgPool,
}

impl PgMessageLog {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn message_from_row(row: &PgRow) -> BroadcastMessage {
    BroadcastMessage {
        id: row.get("id"),
        title: row.get("title"),
        body: row.get("body"),
        success_count: row.get("success_count"),
        failure_count: row.get("failure_count"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl MessageLog for PgMessageLog {
    async fn record(
        &self,
        title: &str,
        body: &str,
        success_count: usize,
        failure_count: usize,
    ) -> Result<BroadcastMessage> {
        let query = r#"
            INSERT INTO broadcast_messages (
                id, title, body, success_count, failure_count, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, body, success_count, failure_count, created_at
        "#;

        let row = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(title)
            .bind(body)
            .bind(i32::try_from(success_count).unwrap_or(i32::MAX))
            .bind(i32::try_from(failure_count).unwrap_or(i32::MAX))
            .bind(Utc::now())
            .fetch_one(&self.db)
            .await
            .map_err(|e| {
                error!("Failed to record broadcast message: {}", e);
                AppError::from(e)
            })?;

        Ok(message_from_row(&row))
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<BroadcastMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, body, success_count, failure_count, created_at
            FROM broadcast_messages
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.iter().map(message_from_row).collect())
    }
}
