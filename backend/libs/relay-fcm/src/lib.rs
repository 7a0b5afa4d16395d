/// Relay FCM Library
///
/// Push delivery for the token relay. Exposes the `PushProvider` capability
/// consumed by the service and `FcmClient`, its Firebase Cloud Messaging
/// (HTTP v1) implementation.
///
/// It handles:
/// - OAuth2 token generation using Google service accounts
/// - Token caching with automatic refresh
/// - Single, multicast and topic message delivery
/// - Classification of per-token failures into permanent and transient

pub mod client;
pub mod errors;
pub mod models;
pub mod provider;

pub use client::{FcmClient, FcmClientOptions};
pub use errors::FcmError;
pub use models::{
    FailureClass, FailureReason, MulticastSendResult, PushNotification, SendFailure, SendReceipt,
    ServiceAccountKey, TokenOutcome,
};
pub use provider::{DynPushProvider, PushProvider};
