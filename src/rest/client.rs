//! Request/response pipeline shared by every issue#1 REST call.
//!
//! All endpoints answer with a status envelope:
//!
//! ```json
//! { "status": "success" | "fail" | "error", "data": ..., "message": "..." }
//! ```
//!
//! `fail` responses carry `{ "errorReason": ..., "errorMessage": ... }` as their data.

use std::time::Duration;

use http::StatusCode;
use reqwest::{Method, RequestBuilder, Url, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by the REST client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// HTTP 401: the token was not accepted or does not grant access.
    #[error("access denied by the REST service")]
    AccessDenied,

    /// The username and password combination was refused.
    #[error("credentials not accepted")]
    CredentialsUnaccepted,

    #[error("not found: {0}")]
    NotFound(String),

    /// The submitted data is missing required fields or is malformed.
    #[error("data not accepted: {0}")]
    InvalidData(String),

    /// A unique attribute (`username`, `email`) is already taken.
    #[error("{0} is occupied")]
    Occupied(String),

    #[error("forbidden request")]
    Forbidden,

    /// The response was unexpected or could not be parsed.
    #[error("REST server error: {0}")]
    Server(String),

    #[error("connection to the REST service failed: {0}")]
    Connection(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        UpstreamError::Connection(e.to_string())
    }
}

#[derive(Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct Payload<T> {
    data: Option<T>,
}

/// Data attached to a `fail` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FailData {
    #[serde(rename = "errorReason", default)]
    pub error_reason: String,
    #[serde(rename = "errorMessage", default)]
    pub error_message: String,
}

/// A `fail` response together with its HTTP status.
#[derive(Debug, Clone)]
pub struct Failure {
    pub status: StatusCode,
    pub data: FailData,
}

impl Failure {
    /// Maps the failure to an error using the status codes shared by all endpoints.
    pub fn into_error(self) -> UpstreamError {
        match self.status {
            StatusCode::BAD_REQUEST => UpstreamError::InvalidData(self.data.error_reason),
            StatusCode::FORBIDDEN => UpstreamError::Forbidden,
            StatusCode::NOT_FOUND => UpstreamError::NotFound(self.data.error_reason),
            StatusCode::CONFLICT => UpstreamError::Occupied(self.data.error_reason),
            status => UpstreamError::Server(format!(
                "unexpected fail response {status}: {}",
                self.data.error_message
            )),
        }
    }
}

/// A decoded response envelope.
pub enum Reply<T> {
    Success(Option<T>),
    Fail(Failure),
}

impl<T> Reply<T> {
    /// Returns the data of a successful reply, mapping failures with `on_fail`.
    pub fn into_data(
        self,
        on_fail: impl FnOnce(Failure) -> UpstreamError,
    ) -> Result<T, UpstreamError> {
        match self {
            Reply::Success(Some(data)) => Ok(data),
            Reply::Success(None) => Err(UpstreamError::Server(
                "success response carried no data".to_string(),
            )),
            Reply::Fail(failure) => Err(on_fail(failure)),
        }
    }

    /// Like [`Reply::into_data`] for endpoints whose data is irrelevant.
    pub fn into_unit(
        self,
        on_fail: impl FnOnce(Failure) -> UpstreamError,
    ) -> Result<(), UpstreamError> {
        match self {
            Reply::Success(_) => Ok(()),
            Reply::Fail(failure) => Err(on_fail(failure)),
        }
    }
}

/// Computes `(limit, offset)` for a 1-based page. Page 0 is treated as page 1.
pub fn limit_offset(page: u32, per_page: u32) -> (u32, u32) {
    let page = page.max(1);
    (per_page, (page - 1).saturating_mul(per_page))
}

/// Client for the issue#1 REST service.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    /// Creates a new `RestClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Root URL of the REST service.
    /// * `timeout` - Per-request timeout, covering connect and body.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| UpstreamError::Connection(format!("invalid base URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::Connection(format!(
                "invalid base URL {base_url}"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds the URL for the given path segments. Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Starts a request to the given path, with a bearer token if one is given.
    pub(crate) fn request(
        &self,
        method: Method,
        segments: &[&str],
        token: Option<&str>,
    ) -> RequestBuilder {
        let builder = self.http.request(method, self.endpoint(segments));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Attaches `body` as JSON.
    pub(crate) fn with_json<B: Serialize>(
        builder: RequestBuilder,
        body: &B,
    ) -> Result<RequestBuilder, UpstreamError> {
        let bytes = sonic_rs::to_vec(body)
            .map_err(|e| UpstreamError::InvalidData(format!("unserializable body: {e}")))?;
        Ok(builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(bytes))
    }

    /// Sends a request and decodes the response envelope.
    ///
    /// HTTP 401 is reported as [`UpstreamError::AccessDenied`] whatever the body.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Reply<T>, UpstreamError> {
        let response = builder.send().await?;
        let status = response.status();
        tracing::debug!("📡 REST {} -> {}", response.url().path(), status);

        if status == StatusCode::UNAUTHORIZED {
            return Err(UpstreamError::AccessDenied);
        }

        let body = response.bytes().await?;
        decode(status, &body)
    }
}

fn decode<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<Reply<T>, UpstreamError> {
    let envelope: Envelope = sonic_rs::from_slice(body)
        .map_err(|e| UpstreamError::Server(format!("malformed response envelope: {e}")))?;

    match envelope.status.as_str() {
        "success" => {
            let payload: Payload<T> = sonic_rs::from_slice(body)
                .map_err(|e| UpstreamError::Server(format!("malformed response data: {e}")))?;
            Ok(Reply::Success(payload.data))
        }
        "fail" => {
            let payload: Payload<FailData> = sonic_rs::from_slice(body)
                .map_err(|e| UpstreamError::Server(format!("malformed fail data: {e}")))?;
            let data = payload.data.unwrap_or_default();
            tracing::debug!(
                "📭 REST fail {}: {} {}",
                status,
                data.error_reason,
                data.error_message
            );
            Ok(Reply::Fail(Failure { status, data }))
        }
        "error" => Err(UpstreamError::Server(
            envelope
                .message
                .unwrap_or_else(|| "REST service reported an error".to_string()),
        )),
        other => Err(UpstreamError::Server(format!(
            "unrecognized response status {other:?}"
        ))),
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    use axum::Router;
    use tokio::net::TcpListener;

    /// Serves `app` on an ephemeral local port and returns its base URL.
    pub async fn spawn(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }
}
