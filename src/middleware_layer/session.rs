use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tower_cookies::cookie::SameSite;
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};

use crate::{
    config::Config,
    crypto::session_id::generate_session_id,
    error::{AppError, Result},
    services::session::{Session, SessionError},
    state::AppState,
};

/// Builds the session cookie carrying `id`.
///
/// # Arguments
///
/// * `config` - Supplies the cookie name, `Secure` flag and `Max-Age`.
/// * `id` - The session identifier.
pub fn session_cookie(config: &Config, id: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(config.cookie_name.clone(), id);
    cookie.set_http_only(true);
    cookie.set_secure(config.https);
    cookie.set_same_site(SameSite::Strict);
    cookie.set_max_age(Duration::seconds(config.session_hard_lifetime.num_seconds()));
    cookie.set_path("/");
    cookie
}

/// Extracts the session identifier from the request cookies.
fn extract_session_id(config: &Config, cookies: &Cookies) -> Option<String> {
    cookies
        .get(&config.cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Resolves the session named by the request cookie, or starts a new one.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `cookies` - The request cookies. The session cookie is (re)issued on them.
///
/// # Returns
///
/// The session bound to this browser. Store failures other than a missing
/// session are returned as errors.
pub async fn session_start(state: &AppState, cookies: &Cookies) -> Result<Session> {
    if let Some(id) = extract_session_id(&state.config, cookies) {
        match state.sessions.get_session(&id).await {
            Ok(session) => {
                tracing::debug!(
                    "🔑 Session resumed, last seen {}, expires {}",
                    session.last_access_time().await,
                    session.expires().await
                );
                cookies.add(session_cookie(&state.config, id));
                return Ok(session);
            }
            Err(SessionError::NotFound) => {
                tracing::debug!("❔ Session cookie names no live session, starting anew");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let session = state
        .sessions
        .new_session(generate_session_id(), state.config.session_hard_lifetime)
        .await?;
    cookies.add(session_cookie(&state.config, session.id().to_string()));
    tracing::debug!("🍪 New session cookie issued");
    Ok(session)
}

/// Like [`session_start`], but fails with [`AppError::NotLoggedIn`] for
/// anonymous sessions.
pub async fn session_start_logged_in(state: &AppState, cookies: &Cookies) -> Result<Session> {
    let session = session_start(state, cookies).await?;
    if !session.is_logged_in().await {
        return Err(AppError::NotLoggedIn);
    }
    Ok(session)
}

/// Deletes the session named by the request cookie and expires the cookie.
///
/// Does nothing without a session cookie. A session that is already gone
/// counts as destroyed.
pub async fn session_destroy(state: &AppState, cookies: &Cookies) -> Result<()> {
    let Some(id) = extract_session_id(&state.config, cookies) else {
        return Ok(());
    };

    match state.sessions.delete_session(&id).await {
        Ok(_) => tracing::debug!("🗑️ Session deleted"),
        Err(SessionError::NotFound) => tracing::debug!("🗑️ Session already gone"),
        Err(e) => return Err(e.into()),
    }

    let mut cookie = Cookie::new(state.config.cookie_name.clone(), "");
    cookie.set_path("/");
    cookies.remove(cookie);
    Ok(())
}

/// Replaces the current session with a fresh one.
pub async fn session_renew(state: &AppState, cookies: &Cookies) -> Result<Session> {
    session_destroy(state, cookies).await?;
    session_start(state, cookies).await
}

/// A middleware that binds a session, new or resumed, to every request.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `cookies` - The request cookies.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
pub async fn start_session(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let session = session_start(&state, &cookies).await?;
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// A middleware that requires a logged in session, redirecting to the front
/// page otherwise.
pub async fn require_login(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let session = session_start_logged_in(&state, &cookies).await?;
    tracing::debug!("✅ Logged in request");
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
