use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use relay_fcm::ServiceAccountKey;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::error::{AppError, Result};

#[derive(Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub app_port: u16,
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
    /// Path to a service account JSON file
    pub fcm_credentials_path: Option<String>,
    /// Base64-encoded service account JSON, for hosts without a writable disk
    pub fcm_credentials_base64: Option<String>,
    /// Overrides the project id found in the credentials
    pub fcm_project_id: Option<String>,
    #[serde(default = "default_send_timeout_secs")]
    pub push_send_timeout_secs: u64,
    #[serde(default = "default_multicast_concurrency")]
    pub push_multicast_concurrency: usize,
    #[serde(default = "default_admin_topic")]
    pub admin_topic: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    10
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_multicast_concurrency() -> usize {
    16
}

fn default_admin_topic() -> String {
    "admin_messages_topic".to_string()
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("app_port", &self.app_port)
            .field("database_url", &"[REDACTED]")
            .field("database_max_connections", &self.database_max_connections)
            .field("fcm_credentials_path", &self.fcm_credentials_path)
            .field(
                "fcm_credentials_base64",
                &self.fcm_credentials_base64.as_ref().map(|_| "[REDACTED]"),
            )
            .field("fcm_project_id", &self.fcm_project_id)
            .field("push_send_timeout_secs", &self.push_send_timeout_secs)
            .field("push_multicast_concurrency", &self.push_multicast_concurrency)
            .field("admin_topic", &self.admin_topic)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars).map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn push_send_timeout(&self) -> Duration {
        Duration::from_secs(self.push_send_timeout_secs)
    }

    /// Where the provider credentials come from. The file path wins when
    /// both are set.
    pub fn credential_source(&self) -> Result<CredentialSource> {
        match (&self.fcm_credentials_path, &self.fcm_credentials_base64) {
            (Some(path), _) if !path.trim().is_empty() => Ok(CredentialSource::File(path.clone())),
            (_, Some(encoded)) if !encoded.trim().is_empty() => {
                Ok(CredentialSource::Base64(encoded.clone()))
            }
            _ => Err(AppError::CredentialLoad(
                "set FCM_CREDENTIALS_PATH or FCM_CREDENTIALS_BASE64".to_string(),
            )),
        }
    }
}

/// Service account credential location
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    File(String),
    Base64(String),
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::File(path) => f.debug_tuple("File").field(path).finish(),
            CredentialSource::Base64(_) => f.write_str("Base64([REDACTED])"),
        }
    }
}

impl CredentialSource {
    pub fn load(&self) -> Result<ServiceAccountKey> {
        let raw = match self {
            CredentialSource::File(path) => std::fs::read(path).map_err(|e| {
                AppError::CredentialLoad(format!("cannot read {}: {}", path, e))
            })?,
            CredentialSource::Base64(encoded) => STANDARD
                .decode(encoded.trim())
                .map_err(|e| AppError::CredentialLoad(format!("invalid base64: {}", e)))?,
        };

        let key: ServiceAccountKey = serde_json::from_slice(&raw)
            .map_err(|e| AppError::CredentialLoad(format!("invalid service account JSON: {}", e)))?;

        if key.private_key.trim().is_empty() || key.client_email.trim().is_empty() {
            return Err(AppError::CredentialLoad(
                "service account is missing private_key or client_email".to_string(),
            ));
        }

        Ok(key)
    }
}
