use std::future::Future;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::session::{REST_TOKEN_KEY, USERNAME_KEY};
use crate::rest::client::{RestClient, UpstreamError};
use crate::services::session::Session;

/// Exchanges an upstream bearer token for a fresh one.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh_auth_token(&self, token: &str) -> std::result::Result<String, UpstreamError>;
}

#[async_trait]
impl TokenRefresher for RestClient {
    async fn refresh_auth_token(&self, token: &str) -> std::result::Result<String, UpstreamError> {
        RestClient::refresh_auth_token(self, token).await
    }
}

/// Drops the upstream identity from a session, leaving it anonymous.
async fn forget_identity(session: &Session) -> Result<()> {
    session.delete(REST_TOKEN_KEY).await?;
    session.delete(USERNAME_KEY).await?;
    Ok(())
}

/// Runs an upstream call with the session's bearer token, refreshing the token
/// once if the call is denied.
///
/// # Arguments
///
/// * `session` - The logged in session holding the token.
/// * `refresher` - Used to swap a denied token for a fresh one.
/// * `op` - The upstream call, given the token to use.
///
/// # Returns
///
/// The outcome of the first call, or of the single retry after a successful
/// refresh. A refresh that is itself denied yields
/// [`AppError::UpstreamCredentialExpired`]. Whenever access stays denied the
/// session is logged out before the error is returned.
pub async fn call_with_refresh<T, R, F, Fut>(
    session: &Session,
    refresher: &R,
    mut op: F,
) -> Result<T>
where
    R: TokenRefresher + ?Sized,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = std::result::Result<T, UpstreamError>>,
{
    let token = session.get(REST_TOKEN_KEY).await;

    match op(token.clone()).await {
        Err(UpstreamError::AccessDenied) => {}
        other => return other.map_err(AppError::from),
    }

    tracing::debug!("🔄 Upstream token denied, refreshing");
    let fresh = match refresher.refresh_auth_token(&token).await {
        Ok(fresh) => fresh,
        Err(UpstreamError::AccessDenied) => {
            tracing::info!("⌛ Upstream token could not be refreshed, logging out");
            forget_identity(session).await?;
            return Err(AppError::UpstreamCredentialExpired);
        }
        Err(e) => return Err(e.into()),
    };
    session.set(REST_TOKEN_KEY, &fresh).await?;

    match op(fresh).await {
        Err(UpstreamError::AccessDenied) => {
            tracing::warn!("🔒 Refreshed upstream token denied, logging out");
            forget_identity(session).await?;
            Err(UpstreamError::AccessDenied.into())
        }
        other => other.map_err(AppError::from),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Duration;

    use super::*;
    use crate::repositories::memory_session::MemorySessionStore;
    use crate::services::session::SessionManager;

    struct CountingRefresher {
        calls: AtomicUsize,
        outcome: std::result::Result<String, UpstreamError>,
    }

    impl CountingRefresher {
        fn new(outcome: std::result::Result<String, UpstreamError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome,
            }
        }
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn refresh_auth_token(&self, _: &str) -> std::result::Result<String, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    async fn logged_in_session() -> Session {
        let manager =
            SessionManager::new(Arc::new(MemorySessionStore::new()), Duration::hours(1));
        let session = manager
            .new_session("sid".to_string(), Duration::days(1))
            .await
            .unwrap();
        session.set(USERNAME_KEY, "loveless").await.unwrap();
        session.set(REST_TOKEN_KEY, "old").await.unwrap();
        session
    }

    #[tokio::test]
    async fn accepted_token_needs_no_refresh() {
        let session = logged_in_session().await;
        let refresher = CountingRefresher::new(Ok("new".into()));

        let result = call_with_refresh(&session, &refresher, |token| async move {
            Ok::<_, UpstreamError>(token)
        })
        .await
        .unwrap();

        assert_eq!(result, "old");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn denied_call_is_retried_once_with_fresh_token() {
        let session = logged_in_session().await;
        let refresher = CountingRefresher::new(Ok("new".into()));
        let seen = std::sync::Mutex::new(Vec::new());

        let result = call_with_refresh(&session, &refresher, |token| {
            seen.lock().unwrap().push(token.clone());
            async move {
                if token == "new" {
                    Ok("feed")
                } else {
                    Err(UpstreamError::AccessDenied)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, "feed");
        assert_eq!(*seen.lock().unwrap(), vec!["old", "new"]);
        assert_eq!(session.get(REST_TOKEN_KEY).await, "new");
    }

    #[tokio::test]
    async fn retry_failure_is_final() {
        let session = logged_in_session().await;
        let refresher = CountingRefresher::new(Ok("new".into()));
        let calls = AtomicUsize::new(0);

        let result = call_with_refresh(&session, &refresher, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(UpstreamError::AccessDenied) }
        })
        .await;

        assert!(matches!(
            result,
            Err(AppError::Upstream(UpstreamError::AccessDenied))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert!(!session.is_logged_in().await);
        assert_eq!(session.get(REST_TOKEN_KEY).await, "");
    }

    #[tokio::test]
    async fn denied_refresh_is_terminal() {
        let session = logged_in_session().await;
        let refresher = CountingRefresher::new(Err(UpstreamError::AccessDenied));
        let calls = AtomicUsize::new(0);

        let result = call_with_refresh(&session, &refresher, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(UpstreamError::AccessDenied) }
        })
        .await;

        assert!(matches!(result, Err(AppError::UpstreamCredentialExpired)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!session.is_logged_in().await);
        assert_eq!(session.get(REST_TOKEN_KEY).await, "");
    }

    #[tokio::test]
    async fn failed_refresh_is_a_server_error() {
        let session = logged_in_session().await;
        let refresher =
            CountingRefresher::new(Err(UpstreamError::Connection("refused".into())));

        let result = call_with_refresh(&session, &refresher, |_| async {
            Err::<(), _>(UpstreamError::AccessDenied)
        })
        .await;

        assert!(matches!(
            result,
            Err(AppError::Upstream(UpstreamError::Connection(_)))
        ));
        assert!(session.is_logged_in().await);
    }

    #[tokio::test]
    async fn other_errors_skip_refresh() {
        let session = logged_in_session().await;
        let refresher = CountingRefresher::new(Ok("new".into()));

        let result = call_with_refresh(&session, &refresher, |_| async {
            Err::<(), _>(UpstreamError::NotFound("post 1".into()))
        })
        .await;

        assert!(matches!(result, Err(AppError::Upstream(UpstreamError::NotFound(_)))));
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }
}
