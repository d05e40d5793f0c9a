//! Кеш Redis для поиска событий. Остаток билетов не кешируется.

use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use tracing::{debug, info};

use crate::models::EventSummary;

#[derive(Clone)]
pub struct CacheService {
    conn: MultiplexedConnection,
    ttl_seconds: u64,
}

impl CacheService {
    pub async fn connect(redis_url: &str, ttl_seconds: u64) -> redis::RedisResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        info!(ttl_seconds, "search cache connected");
        Ok(Self { conn, ttl_seconds })
    }

    fn search_key(term: &str) -> String {
        format!("search:events:{term}")
    }

    pub async fn get_cached_search(
        &self,
        term: &str,
    ) -> Result<Option<Vec<EventSummary>>, redis::RedisError> {
        let mut conn = self.conn.clone();
        let cached: Option<String> = conn.get(Self::search_key(term)).await?;
        let Some(json) = cached else {
            return Ok(None);
        };
        let events = serde_json::from_str(&json).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
        })?;
        debug!(term, "search cache hit");
        Ok(Some(events))
    }

    pub async fn cache_search_result(
        &self,
        term: &str,
        events: &[EventSummary],
    ) -> Result<(), redis::RedisError> {
        let json = serde_json::to_string(events).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.conn.clone();
        conn.set_ex(Self::search_key(term), json, self.ttl_seconds).await
    }
}
