use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::session::SessionRecord;

/// Errors reported by a session store backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No record exists under the requested identifier.
    #[error("session record not found")]
    NotFound,

    /// The backend failed to carry out the operation.
    #[error("session store backend error: {0}")]
    Backend(String),
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(e: tokio_postgres::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for StoreError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Persistence contract for session records.
///
/// Implementations:
/// - [`PostgresSessionStore`](super::postgres_session::PostgresSessionStore): `sessions` and `session_data` tables
/// - [`MemorySessionStore`](super::memory_session::MemorySessionStore): process-local, for tests and database-less runs
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads a record together with all its key-value pairs.
    async fn get(&self, uuid: &str) -> Result<SessionRecord, StoreError>;

    /// Inserts a new record.
    async fn create(&self, record: &SessionRecord) -> Result<(), StoreError>;

    /// Overwrites a record and replaces its pairs.
    async fn update(&self, record: &SessionRecord) -> Result<(), StoreError>;

    /// Removes a record and its pairs.
    async fn delete(&self, uuid: &str) -> Result<(), StoreError>;

    /// Removes every record whose hard expiry is before `now`.
    ///
    /// Returns the number of records removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}
