use subtle::ConstantTimeEq;

use crate::config::Config;
use crate::crypto::csrf;
use crate::error::Result;
use crate::models::session::CSRF_KEY;
use crate::services::session::Session;

/// Issues a fresh CSRF token and stores it on the session, superseding any
/// previous one.
///
/// # Returns
///
/// The token to embed in the rendered form.
pub async fn issue_for_session(config: &Config, session: &Session) -> Result<String> {
    let token = csrf::issue_token(
        None,
        &config.token_signing_secret,
        config.csrf_token_lifetime,
    )?;
    session.set(CSRF_KEY, &token).await?;
    Ok(token)
}

/// Checks a submitted token: it must verify and equal the session's current token.
pub async fn verify_submission(config: &Config, session: &Session, submitted: &str) -> bool {
    if !csrf::verify_token(submitted, &config.token_signing_secret) {
        return false;
    }
    let stored = session.get(CSRF_KEY).await;
    !stored.is_empty() && bool::from(stored.as_bytes().ct_eq(submitted.as_bytes()))
}
