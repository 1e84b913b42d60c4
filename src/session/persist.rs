//! Storage seam for the session store
//!
//! The store only sees an opaque string key-value facility, so tests can
//! swap the database for an in-memory map.

use crate::db::Database;
use std::sync::Arc;

/// Opaque key-value storage for persisted session entries
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value under `key`, `None` if absent
    fn read(&self, key: &str) -> Result<Option<String>, String>;

    /// Replace the value under `key`
    fn write(&self, key: &str, value: &str) -> Result<(), String>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn read(&self, key: &str) -> Result<Option<String>, String> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), String> {
        (**self).write(key, value)
    }
}

/// Adapter to use Database as session storage
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl KeyValueStore for DatabaseStorage {
    fn read(&self, key: &str) -> Result<Option<String>, String> {
        self.db.get(key).map_err(|e| e.to_string())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), String> {
        self.db.set(key, value).map_err(|e| e.to_string())
    }
}
