use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

mod memory;

pub use memory::MemoryBackend;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("wrong value type stored at {0}")]
    WrongType(String),
}

/// Key-value store holding account records.
///
/// Every method is a single-key operation and atomic on its own; nothing here
/// spans more than one key.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    async fn hash_set(&self, key: &str, fields: &[(&str, String)]) -> Result<(), BackendError>;
    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, BackendError>;
    async fn string_set(&self, key: &str, value: &str) -> Result<(), BackendError>;
    /// Returns `false` when the key already existed and nothing was written.
    async fn string_set_if_absent(&self, key: &str, value: &str) -> Result<bool, BackendError>;
    async fn string_get(&self, key: &str) -> Result<Option<String>, BackendError>;
    async fn key_delete(&self, key: &str) -> Result<bool, BackendError>;
}

pub struct RedisBackend {
    conn: Arc<Mutex<MultiplexedConnection>>,
}

impl RedisBackend {
    pub async fn connect(redis_url: &str) -> Result<Self, BackendError> {
        tracing::info!(url = %redact_url(redis_url), "connecting to redis");
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    async fn hash_set(&self, key: &str, fields: &[(&str, String)]) -> Result<(), BackendError> {
        let mut conn = self.conn.lock().await;
        conn.hset_multiple::<_, _, _, ()>(key, fields).await?;
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, BackendError> {
        let mut conn = self.conn.lock().await;
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(fields.into_iter().collect())
    }

    async fn string_set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let mut conn = self.conn.lock().await;
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn string_set_if_absent(&self, key: &str, value: &str) -> Result<bool, BackendError> {
        let mut conn = self.conn.lock().await;
        let written: bool = conn.set_nx(key, value).await?;
        Ok(written)
    }

    async fn string_get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let mut conn = self.conn.lock().await;
        let value: Option<String> = conn.get(key).await?;
        Ok(value.filter(|value| !value.is_empty()))
    }

    async fn key_delete(&self, key: &str) -> Result<bool, BackendError> {
        let mut conn = self.conn.lock().await;
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }
}

/// Masks the password part of a connection URL so it can be logged.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let (authority, path) = rest.split_at(rest.find('/').unwrap_or(rest.len()));
    let Some((userinfo, host)) = authority.rsplit_once('@') else {
        return url.to_string();
    };
    // redis URLs often carry a password with an empty user: `:secret@host`
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{}://{}:***@{}{}", scheme, user, host, path),
        None => url.to_string(),
    }
}

/// Opens the configured backend, falling back to the in-process store when no
/// Redis URL is set.
pub async fn connect(redis_url: Option<&str>) -> Result<Arc<dyn KeyValueBackend>, BackendError> {
    let backend: Arc<dyn KeyValueBackend> = match redis_url {
        Some(url) => Arc::new(RedisBackend::connect(url).await?),
        None => {
            tracing::warn!("REDIS_URL is not set; accounts are kept in memory only");
            Arc::new(MemoryBackend::new())
        }
    };
    Ok(backend)
}
