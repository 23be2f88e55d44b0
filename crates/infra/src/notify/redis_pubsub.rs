//! Redis pub/sub change notifier.
//!
//! Redis pub/sub is fire-and-forget: subscribers that are offline miss the
//! message. That is acceptable for cache invalidation; a missed notice only
//! delays a refresh.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::{ChangeNotifier, NotifyError};

/// Publishes change notices with `PUBLISH <channel> <message>`.
///
/// Holds a `ConnectionManager`, which multiplexes one connection and
/// reconnects on its own after failures. Cloning is cheap.
#[derive(Clone)]
pub struct RedisChangeNotifier {
    conn: ConnectionManager,
}

impl RedisChangeNotifier {
    pub async fn connect(redis_url: impl AsRef<str>) -> Result<Self, NotifyError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| NotifyError::Backend(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| NotifyError::Backend(e.to_string()))?;
        Ok(Self { conn })
    }
}

impl core::fmt::Debug for RedisChangeNotifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RedisChangeNotifier").finish_non_exhaustive()
    }
}

#[async_trait]
impl ChangeNotifier for RedisChangeNotifier {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), NotifyError> {
        let mut conn = self.conn.clone();
        let receivers: i64 = conn
            .publish(channel, message)
            .await
            .map_err(|e| NotifyError::Backend(e.to_string()))?;

        tracing::debug!(channel, receivers, "change notice published");
        Ok(())
    }
}
