//! In-memory key-value store

use super::KeyValueStore;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Process-local key-value store. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|e| AppError::Generic(format!("Memory store poisoned: {}", e)))?;
        Ok(values.get(key).cloned())
    }

    async fn set_many(&self, entries: &[(&str, String)]) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| AppError::Generic(format!("Memory store poisoned: {}", e)))?;

        for (key, value) in entries {
            values.insert((*key).to_string(), value.clone());
        }

        tracing::debug!("Stored {} key(s) in memory", entries.len());
        Ok(())
    }
}
