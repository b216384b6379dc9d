use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::session::{SessionRecord, USERNAME_KEY};
use crate::repositories::session::{SessionStore, StoreError};

/// Errors surfaced by the session manager and session handles.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session does not exist, or has expired.
    #[error("session not found")]
    NotFound,

    /// The store failed. `causes` lists the underlying failures in order.
    #[error("session store failed: {}", .causes.join("; "))]
    Store { causes: Vec<String> },
}

impl From<StoreError> for SessionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => SessionError::NotFound,
            StoreError::Backend(cause) => SessionError::Store {
                causes: vec![cause],
            },
        }
    }
}

/// Creates, loads, persists and deletes sessions against a [`SessionStore`].
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    idle_lifetime: Duration,
}

impl SessionManager {
    /// Creates a new `SessionManager`.
    ///
    /// # Arguments
    ///
    /// * `store` - The backing session store.
    /// * `idle_lifetime` - How long a session may go unused before it is treated as gone.
    pub fn new(store: Arc<dyn SessionStore>, idle_lifetime: Duration) -> Self {
        Self {
            store,
            idle_lifetime,
        }
    }

    /// Creates and persists an empty session.
    ///
    /// # Arguments
    ///
    /// * `id` - The new session identifier.
    /// * `hard_lifetime` - Time until the session expires regardless of use.
    ///
    /// # Returns
    ///
    /// A handle to the new session.
    pub async fn new_session(
        &self,
        id: String,
        hard_lifetime: Duration,
    ) -> Result<Session, SessionError> {
        let record = SessionRecord::new(id, hard_lifetime);
        self.add_session(&record).await?;
        tracing::debug!("🆕 Session created, expires at {}", record.expires);
        Ok(Session::from_record(self.clone(), record))
    }

    /// Loads a session and refreshes its last access time.
    ///
    /// Sessions past their hard expiry or idle lifetime are reported as
    /// [`SessionError::NotFound`].
    pub async fn get_session(&self, id: &str) -> Result<Session, SessionError> {
        let mut record = self.store.get(id).await?;

        if record.is_expired(Utc::now(), self.idle_lifetime) {
            tracing::debug!("⌛ Session expired, treating as absent");
            return Err(SessionError::NotFound);
        }

        self.update_session(&mut record).await?;
        Ok(Session::from_record(self.clone(), record))
    }

    /// Persists a new record as-is.
    pub async fn add_session(&self, record: &SessionRecord) -> Result<(), SessionError> {
        self.store.create(record).await.map_err(SessionError::from)
    }

    /// Stamps `last_access_time` with the current time and persists the record.
    pub async fn update_session(&self, record: &mut SessionRecord) -> Result<(), SessionError> {
        let now = Utc::now();
        // clock skew must not move the access time backwards
        if now > record.last_access_time {
            record.last_access_time = now;
        }
        self.store.update(record).await.map_err(SessionError::from)
    }

    /// Deletes a session after confirming it exists.
    ///
    /// # Returns
    ///
    /// The record as it was before deletion.
    pub async fn delete_session(&self, id: &str) -> Result<SessionRecord, SessionError> {
        let record = self.store.get(id).await?;
        self.store.delete(id).await.map_err(|e| match e {
            // deleted concurrently between the fetch and the delete
            StoreError::NotFound => SessionError::NotFound,
            StoreError::Backend(cause) => SessionError::Store {
                causes: vec!["delete after fetch".to_string(), cause],
            },
        })?;
        Ok(record)
    }

    /// Removes every session whose hard expiry has passed.
    pub async fn sweep_expired(&self) -> Result<u64, SessionError> {
        self.store
            .delete_expired(Utc::now())
            .await
            .map_err(SessionError::from)
    }
}

struct SessionState {
    record: SessionRecord,
    values: HashMap<String, String>,
}

struct SessionInner {
    id: String,
    manager: SessionManager,
    state: Mutex<SessionState>,
}

/// A handle to a loaded session.
///
/// Clones share the same state; `set` and `delete` on any clone are serialized.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // the id is a bearer credential
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    fn from_record(manager: SessionManager, record: SessionRecord) -> Self {
        let values = record.values();
        Self {
            inner: Arc::new(SessionInner {
                id: record.uuid.clone(),
                manager,
                state: Mutex::new(SessionState { record, values }),
            }),
        }
    }

    /// The session identifier, as carried by the session cookie.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Returns the value stored under `key`, or an empty string.
    pub async fn get(&self, key: &str) -> String {
        let state = self.inner.state.lock().await;
        state.values.get(key).cloned().unwrap_or_default()
    }

    /// Stores `value` under `key` and persists the session.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut state = self.inner.state.lock().await;
        state.values.insert(key.to_string(), value.to_string());
        self.flush(&mut state).await
    }

    /// Removes `key` and persists the session.
    pub async fn delete(&self, key: &str) -> Result<(), SessionError> {
        let mut state = self.inner.state.lock().await;
        state.values.remove(key);
        self.flush(&mut state).await
    }

    /// The username of the logged in user, or an empty string.
    pub async fn username(&self) -> String {
        self.get(USERNAME_KEY).await
    }

    pub async fn is_logged_in(&self) -> bool {
        !self.username().await.is_empty()
    }

    pub async fn expires(&self) -> DateTime<Utc> {
        self.inner.state.lock().await.record.expires
    }

    pub async fn last_access_time(&self) -> DateTime<Utc> {
        self.inner.state.lock().await.record.last_access_time
    }

    async fn flush(&self, state: &mut SessionState) -> Result<(), SessionError> {
        let SessionState { record, values } = state;
        record.replace_values(values);
        self.inner.manager.update_session(record).await
    }
}
