use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{BackendError, KeyValueBackend};

enum Value {
    Hash(Vec<(String, String)>),
    String(String),
}

/// In-process backend with one shared keyspace, so hash and string keys clash
/// the way they do in Redis.
#[derive(Default)]
pub struct MemoryBackend {
    keys: Mutex<HashMap<String, Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn hash_set(&self, key: &str, fields: &[(&str, String)]) -> Result<(), BackendError> {
        let mut keys = self.keys.lock().await;
        let entry = keys
            .entry(key.to_string())
            .or_insert_with(|| Value::Hash(Vec::new()));
        let Value::Hash(stored) = entry else {
            return Err(BackendError::WrongType(key.to_string()));
        };
        for (field, value) in fields {
            match stored.iter_mut().find(|(name, _)| name.as_str() == *field) {
                Some((_, existing)) => *existing = value.clone(),
                None => stored.push((field.to_string(), value.clone())),
            }
        }
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, BackendError> {
        let keys = self.keys.lock().await;
        match keys.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Hash(fields)) => Ok(fields.clone()),
            Some(Value::String(_)) => Err(BackendError::WrongType(key.to_string())),
        }
    }

    async fn string_set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let mut keys = self.keys.lock().await;
        keys.insert(key.to_string(), Value::String(value.to_string()));
        Ok(())
    }

    async fn string_set_if_absent(&self, key: &str, value: &str) -> Result<bool, BackendError> {
        let mut keys = self.keys.lock().await;
        if keys.contains_key(key) {
            return Ok(false);
        }
        keys.insert(key.to_string(), Value::String(value.to_string()));
        Ok(true)
    }

    async fn string_get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let keys = self.keys.lock().await;
        match keys.get(key) {
            None => Ok(None),
            Some(Value::String(value)) if value.is_empty() => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(Value::Hash(_)) => Err(BackendError::WrongType(key.to_string())),
        }
    }

    async fn key_delete(&self, key: &str) -> Result<bool, BackendError> {
        let mut keys = self.keys.lock().await;
        Ok(keys.remove(key).is_some())
    }
}
