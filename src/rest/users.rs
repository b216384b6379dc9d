use std::collections::BTreeMap;

use http::StatusCode;
use reqwest::Method;

use super::client::{Failure, RestClient, UpstreamError};
use super::entities::{Post, User};

/// `fail` mapping for endpoints that write a user.
fn user_write_failure(failure: Failure) -> UpstreamError {
    match (failure.status, failure.data.error_reason.as_str()) {
        (StatusCode::CONFLICT, "email" | "username") => {
            UpstreamError::Occupied(failure.data.error_reason)
        }
        (StatusCode::CONFLICT, reason) => {
            UpstreamError::Server(format!("unexpected conflict on {reason}"))
        }
        _ => failure.into_error(),
    }
}

impl RestClient {
    /// Registers a new user.
    ///
    /// Returns [`UpstreamError::Occupied`] with `"username"` or `"email"` when
    /// either is taken, and [`UpstreamError::InvalidData`] naming the offending
    /// field when the user is rejected.
    pub async fn add_user(&self, user: &User) -> Result<User, UpstreamError> {
        let request = Self::with_json(self.request(Method::POST, &["users"], None), user)?;
        self.send::<User>(request)
            .await?
            .into_data(user_write_failure)
    }

    /// Gets the public profile of a user.
    pub async fn get_user(&self, username: &str) -> Result<User, UpstreamError> {
        let request = self.request(Method::GET, &["users", username], None);
        self.send::<User>(request)
            .await?
            .into_data(|_| UpstreamError::NotFound(format!("user {username}")))
    }

    /// Gets a user including private fields such as the email address.
    pub async fn get_user_authorized(
        &self,
        username: &str,
        token: &str,
    ) -> Result<User, UpstreamError> {
        let request = self.request(Method::GET, &["users", username], Some(token));
        self.send::<User>(request)
            .await?
            .into_data(|_| UpstreamError::NotFound(format!("user {username}")))
    }

    /// Gets the posts bookmarked by a user, keyed by bookmark time.
    pub async fn get_user_bookmarks(
        &self,
        username: &str,
        token: &str,
    ) -> Result<BTreeMap<String, Post>, UpstreamError> {
        let request = self.request(Method::GET, &["users", username, "bookmarks"], Some(token));
        self.send::<BTreeMap<String, Post>>(request)
            .await?
            .into_data(Failure::into_error)
    }
}
