use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::client::{Failure, RestClient, UpstreamError};

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenData {
    token: String,
}

impl RestClient {
    /// Exchanges a username and password for a bearer token.
    ///
    /// # Returns
    ///
    /// The token, or [`UpstreamError::CredentialsUnaccepted`] when the
    /// combination is wrong.
    pub async fn get_auth_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<String, UpstreamError> {
        let request = Self::with_json(
            self.request(Method::POST, &["token-auth"], None),
            &Credentials { username, password },
        )?;

        // no bearer is sent, so a 401 here is about the credentials
        let reply = match self.send::<TokenData>(request).await {
            Err(UpstreamError::AccessDenied) => return Err(UpstreamError::CredentialsUnaccepted),
            other => other?,
        };

        reply
            .into_data(|failure| {
                UpstreamError::Server(format!("token-auth failed: {}", failure.data.error_reason))
            })
            .map(|data| data.token)
    }

    /// Exchanges a token for a fresh one.
    ///
    /// Returns [`UpstreamError::AccessDenied`] if `token` is too old to be refreshed.
    pub async fn refresh_auth_token(&self, token: &str) -> Result<String, UpstreamError> {
        let request = self.request(Method::GET, &["token-auth-refresh"], Some(token));
        self.send::<TokenData>(request)
            .await?
            .into_data(Failure::into_error)
            .map(|data| data.token)
    }

    /// Invalidates `token` for further use.
    pub async fn logout(&self, token: &str) -> Result<(), UpstreamError> {
        let request = self.request(Method::GET, &["logout"], Some(token));
        self.send::<sonic_rs::Value>(request)
            .await?
            .into_unit(Failure::into_error)
    }
}
