use axum::{
    Extension, Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_cookies::Cookies;

use crate::{
    error::Result,
    handlers::common::render,
    middleware_layer::session::{session_destroy, session_renew},
    models::session::{REST_TOKEN_KEY, USERNAME_KEY},
    rest::{client::UpstreamError, entities::User},
    services::{csrf, session::Session},
    state::AppState,
    templates::FrontPage,
    validation::forms::{FormErrors, GENERIC, LoginForm, SignupForm},
};

const TRY_AGAIN: &str = "Please Try Again.";
const WRONG_CREDENTIALS: &str = "Your username or password is wrong";

/// Renders the front page with a freshly issued CSRF token.
async fn render_front(state: &AppState, session: &Session, mut page: FrontPage) -> Result<Response> {
    page.csrf = csrf::issue_for_session(&state.config, session).await?;
    Ok(render(&page)?.into_response())
}

/// Starts a fresh session for `username` holding its upstream token.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `cookies` - The request cookies. The new session cookie is issued on them.
/// * `username` - The user that logged in.
/// * `token` - The upstream bearer token of the user.
async fn log_in(state: &AppState, cookies: &Cookies, username: &str, token: &str) -> Result<()> {
    let session = session_renew(state, cookies).await?;
    session.set(USERNAME_KEY, username).await?;
    session.set(REST_TOKEN_KEY, token).await?;
    tracing::info!("✅ User logged in: {}", username);
    Ok(())
}

/// Shows the login and signup forms, or sends logged in users home.
pub async fn index(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    if session.is_logged_in().await {
        return Ok(Redirect::to("/home").into_response());
    }
    render_front(&state, &session, FrontPage::default()).await
}

/// Handles a login form submission.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `cookies` - The request cookies.
/// * `session` - The session bound to the request.
/// * `form` - The submitted form.
///
/// # Returns
///
/// A redirect home on success. The front page with inline errors otherwise.
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Extension(session): Extension<Session>,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let mut page = FrontPage {
        login_username: form.username.clone(),
        ..Default::default()
    };

    if !csrf::verify_submission(&state.config, &session, &form.csrf).await {
        tracing::warn!("🛡️ CSRF token mismatch on login");
        page.login_errors.add(GENERIC, TRY_AGAIN);
        return render_front(&state, &session, page).await;
    }

    page.login_errors = form.check();
    if !page.login_errors.is_empty() {
        return render_front(&state, &session, page).await;
    }

    let token = match state.rest.get_auth_token(&form.username, &form.password).await {
        Ok(token) => token,
        Err(UpstreamError::CredentialsUnaccepted) => {
            tracing::debug!("🔒 Credentials refused for {}", form.username);
            page.login_errors.add(GENERIC, WRONG_CREDENTIALS);
            return render_front(&state, &session, page).await;
        }
        Err(e) => return Err(e.into()),
    };

    log_in(&state, &cookies, &form.username, &token).await?;
    Ok(Redirect::to("/home").into_response())
}

/// Adds the upstream's refusal of a new user to the signup errors.
fn signup_refusal(errors: &mut FormErrors, e: UpstreamError) -> Option<UpstreamError> {
    match e {
        UpstreamError::Occupied(field) => {
            errors.add(&field, format!("This {field} is already taken"));
            None
        }
        UpstreamError::InvalidData(field) if !field.is_empty() => {
            errors.add(&field, format!("This {field} is not accepted"));
            None
        }
        UpstreamError::InvalidData(_) => {
            errors.add(GENERIC, TRY_AGAIN);
            None
        }
        other => Some(other),
    }
}

/// Handles a signup form submission, logging the new user in on success.
pub async fn signup(
    State(state): State<AppState>,
    cookies: Cookies,
    Extension(session): Extension<Session>,
    Form(form): Form<SignupForm>,
) -> Result<Response> {
    let mut page = FrontPage {
        signup: SignupForm {
            password: String::new(),
            ..form.clone()
        },
        ..Default::default()
    };

    if !csrf::verify_submission(&state.config, &session, &form.csrf).await {
        tracing::warn!("🛡️ CSRF token mismatch on signup");
        page.signup_errors.add(GENERIC, TRY_AGAIN);
        return render_front(&state, &session, page).await;
    }

    page.signup_errors = form.check();
    if !page.signup_errors.is_empty() {
        return render_front(&state, &session, page).await;
    }

    let user = User {
        username: form.username.clone(),
        email: form.email.clone(),
        password: form.password.clone(),
        first_name: form.first_name.clone(),
        middle_name: form.middle_name.clone(),
        last_name: form.last_name.clone(),
        ..Default::default()
    };

    if let Err(e) = state.rest.add_user(&user).await {
        match signup_refusal(&mut page.signup_errors, e) {
            None => return render_front(&state, &session, page).await,
            Some(e) => return Err(e.into()),
        }
    }
    tracing::info!("✅ User registered: {}", form.username);

    let token = state
        .rest
        .get_auth_token(&form.username, &form.password)
        .await?;
    log_in(&state, &cookies, &form.username, &token).await?;
    Ok(Redirect::to("/home").into_response())
}

/// Logs out upstream, best effort, and ends the session.
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    let token = session.get(REST_TOKEN_KEY).await;
    if !token.is_empty() {
        if let Err(e) = state.rest.logout(&token).await {
            tracing::warn!("⚠️ Upstream logout failed: {}", e);
        }
    }

    session_destroy(&state, &cookies).await?;
    tracing::info!("👋 Session ended");
    Ok(Redirect::to("/").into_response())
}
