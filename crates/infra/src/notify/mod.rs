//! Change notification backend.
//!
//! After every committed write the repository announces "something changed"
//! so downstream caches can invalidate. Delivery is best-effort: the notifier
//! may fail, and the caller only logs it.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(feature = "redis")]
pub mod redis_pubsub;

#[cfg(feature = "redis")]
pub use redis_pubsub::RedisChangeNotifier;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification backend error: {0}")]
    Backend(String),

    #[error("notification timed out after {0} ms")]
    Timeout(u64),
}

/// Publish-only capability.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), NotifyError>;
}

/// Channel and payload announced after each mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub channel: String,
    pub message: String,
}

impl Default for ChangeNotice {
    fn default() -> Self {
        Self {
            channel: "update".to_string(),
            message: "legal_entities".to_string(),
        }
    }
}

/// Notifier that drops everything (in-memory mode, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl ChangeNotifier for NoopNotifier {
    async fn publish(&self, _channel: &str, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Notifier that remembers every publish; optionally fails each call.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    published: Mutex<Vec<(String, String)>>,
    fail_with: Option<NotifyError>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the attempt, then returns `err`.
    pub fn failing(err: NotifyError) -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            fail_with: Some(err),
        }
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.published
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChangeNotifier for RecordingNotifier {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), NotifyError> {
        if let Ok(mut p) = self.published.lock() {
            p.push((channel.to_string(), message.to_string()));
        }
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
