use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::crypto::csrf::CsrfError;
use crate::rest::client::UpstreamError;
use crate::services::session::SessionError;
use crate::templates::ErrorPage;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A session store error.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// An error from the issue#1 REST service.
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// The stored upstream token could no longer be refreshed.
    #[error("Upstream credential expired")]
    UpstreamCredentialExpired,

    /// The page requires a logged in session.
    #[error("Not logged in")]
    NotLoggedIn,

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// A template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// A CSRF token could not be issued.
    #[error("CSRF error: {0}")]
    Csrf(#[from] CsrfError),

    /// A malformed request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Renders the generic error page for `status`.
fn error_page(status: StatusCode) -> Response {
    let page = ErrorPage {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Error"),
    };
    match page.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            tracing::error!("Error page failed to render: {}", e);
            (status, page.reason.to_string()).into_response()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Session(ref e) => {
                tracing::error!("Session error: {}", e);
                error_page(StatusCode::INTERNAL_SERVER_ERROR)
            }

            AppError::Upstream(UpstreamError::NotFound(ref what)) => {
                tracing::debug!("Upstream resource not found: {}", what);
                error_page(StatusCode::NOT_FOUND)
            }

            AppError::Upstream(UpstreamError::AccessDenied) => {
                tracing::warn!("Upstream access denied, sending to front page");
                Redirect::to("/").into_response()
            }

            AppError::Upstream(UpstreamError::InvalidData(ref field)) => {
                tracing::debug!("Upstream rejected data: {}", field);
                error_page(StatusCode::BAD_REQUEST)
            }

            AppError::Upstream(ref e) => {
                tracing::error!("Upstream error: {}", e);
                error_page(StatusCode::INTERNAL_SERVER_ERROR)
            }

            AppError::UpstreamCredentialExpired => {
                tracing::info!("Upstream token expired, sending to front page");
                Redirect::to("/").into_response()
            }

            AppError::NotLoggedIn => {
                tracing::debug!("Not logged in, sending to front page");
                Redirect::to("/").into_response()
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                error_page(StatusCode::NOT_FOUND)
            }

            AppError::Template(ref e) => {
                tracing::error!("Template error: {}", e);
                error_page(StatusCode::INTERNAL_SERVER_ERROR)
            }

            AppError::Csrf(ref e) => {
                tracing::error!("CSRF error: {}", e);
                error_page(StatusCode::INTERNAL_SERVER_ERROR)
            }

            AppError::BadRequest(ref msg) => {
                tracing::debug!("Bad request: {}", msg);
                error_page(StatusCode::BAD_REQUEST)
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                error_page(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}
