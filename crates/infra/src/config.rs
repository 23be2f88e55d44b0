//! Process configuration, read from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::notify::ChangeNotice;
use crate::repository::DEFAULT_NOTIFY_TIMEOUT;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_JWT_SECRET: &str = "dev-secret";
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is required when {reason}")]
    Missing { var: &'static str, reason: &'static str },

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Where registry data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageSettings {
    InMemory,
    Persistent {
        database_url: String,
        redis_url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub storage: StorageSettings,
    pub notice: ChangeNotice,
    pub notify_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// In-memory settings with a fixed secret; used by tests and local runs.
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: jwt_secret.into(),
            storage: StorageSettings::InMemory,
            notice: ChangeNotice::default(),
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "BIND_ADDR",
                value: bind_raw.clone(),
                reason: e.to_string(),
            })?;

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEFAULT_JWT_SECRET.to_string()
        });

        let persistent = match var("USE_PERSISTENT_STORES") {
            None => false,
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                var: "USE_PERSISTENT_STORES",
                value: raw,
                reason: "expected true/false/1/0".to_string(),
            })?,
        };

        let storage = if persistent {
            StorageSettings::Persistent {
                database_url: var("DATABASE_URL").ok_or(ConfigError::Missing {
                    var: "DATABASE_URL",
                    reason: "USE_PERSISTENT_STORES is set",
                })?,
                redis_url: var("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            }
        } else {
            StorageSettings::InMemory
        };

        let defaults = ChangeNotice::default();
        let notice = ChangeNotice {
            channel: var("NOTIFY_CHANNEL").unwrap_or(defaults.channel),
            message: var("NOTIFY_MESSAGE").unwrap_or(defaults.message),
        };

        let notify_timeout = match var("NOTIFY_TIMEOUT_MS") {
            None => DEFAULT_NOTIFY_TIMEOUT,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "NOTIFY_TIMEOUT_MS",
                        value: raw,
                        reason: "expected a positive number of milliseconds".to_string(),
                    });
                }
            },
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            storage,
            notice,
            notify_timeout,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
