//! Storage module
//!
//! The record store persists its collections through a small key-value
//! contract. SQLite (see `database::Repository`) backs it on disk;
//! `MemoryStore` backs it in tests and throwaway sessions.

pub mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use async_trait::async_trait;

/// Key-value persistence for serialized collections
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write several keys together; either all of them are stored or none are
    async fn set_many(&self, entries: &[(&str, String)]) -> Result<()>;

    /// Write a single key
    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.set_many(&[(key, value)]).await
    }
}
