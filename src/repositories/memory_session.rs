//! In-memory session storage.
//!
//! Sessions are lost when the process restarts. Used by the test suite and when
//! no `DATABASE_URL` is configured.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::session::SessionRecord;
use crate::repositories::session::{SessionStore, StoreError};

#[derive(Clone, Default)]
pub struct MemorySessionStore {
    records: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records currently stored.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.read().map(|guard| guard.len()).unwrap_or(0)
    }

    /// Returns true if there are no records stored.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("Lock poisoned".to_owned())
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, uuid: &str) -> Result<SessionRecord, StoreError> {
        self.records
            .read()
            .map_err(poisoned)?
            .get(uuid)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        if records.contains_key(&record.uuid) {
            return Err(StoreError::Backend(format!(
                "duplicate session uuid {}",
                record.uuid
            )));
        }
        records.insert(record.uuid.clone(), record.clone());
        Ok(())
    }

    async fn update(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        match records.get_mut(&record.uuid) {
            Some(stored) => {
                *stored = record.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, uuid: &str) -> Result<(), StoreError> {
        self.records
            .write()
            .map_err(poisoned)?
            .remove(uuid)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        let before = records.len();
        records.retain(|_, record| record.expires > now);
        Ok((before - records.len()) as u64)
    }
}
