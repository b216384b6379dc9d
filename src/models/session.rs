use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Session key holding the username of the logged in user. Empty means anonymous.
pub const USERNAME_KEY: &str = "username";
/// Session key holding the bearer token issued by the issue#1 REST service.
pub const REST_TOKEN_KEY: &str = "restRefreshToken";
/// Session key holding the CSRF token most recently issued for this session.
pub const CSRF_KEY: &str = "csrf";

/// A single key-value entry of a session, stored as a row of `session_data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapPair {
    /// The session this pair belongs to.
    pub session_uuid: String,
    pub key: String,
    pub value: String,
}

/// The persisted form of a browser session.
///
/// The relational schema cannot store a map, so the values live in `data` as a
/// list of pairs. [`crate::services::session::Session`] keeps a map view of it.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// The opaque session identifier carried by the session cookie.
    pub uuid: String,
    /// Hard expiry, fixed at creation.
    pub expires: DateTime<Utc>,
    /// Refreshed on every successful load.
    pub last_access_time: DateTime<Utc>,
    pub data: Vec<MapPair>,
}

impl SessionRecord {
    /// Creates an empty record that expires `hard_lifetime` from now.
    pub fn new(uuid: String, hard_lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            uuid,
            expires: now + hard_lifetime,
            last_access_time: now,
            data: Vec::new(),
        }
    }

    /// Returns `true` once the hard expiry has passed or the session sat idle
    /// longer than `idle_lifetime`.
    pub fn is_expired(&self, now: DateTime<Utc>, idle_lifetime: Duration) -> bool {
        now >= self.expires || now - self.last_access_time > idle_lifetime
    }

    /// Builds the map view of `data`.
    pub fn values(&self) -> HashMap<String, String> {
        self.data
            .iter()
            .map(|pair| (pair.key.clone(), pair.value.clone()))
            .collect()
    }

    /// Replaces `data` with the contents of `values`, sorted by key.
    pub fn replace_values(&mut self, values: &HashMap<String, String>) {
        let mut data: Vec<MapPair> = values
            .iter()
            .map(|(key, value)| MapPair {
                session_uuid: self.uuid.clone(),
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        data.sort_by(|a, b| a.key.cmp(&b.key));
        self.data = data;
    }
}
