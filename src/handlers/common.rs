use askama::Template;
use axum::response::Html;
use serde::de::DeserializeOwned;

use crate::{
    error::{AppError, Result},
    services::{auth::call_with_refresh, session::Session},
    state::AppState,
    templates::Navbar,
};

/// Renders a template into an HTML body.
pub fn render<T: Template>(template: &T) -> Result<Html<String>> {
    Ok(Html(template.render()?))
}

/// Decodes a JSON request body.
///
/// # Arguments
///
/// * `body` - The raw request body.
///
/// # Returns
///
/// The decoded value, or [`AppError::BadRequest`] if the body is not valid JSON
/// of the expected shape.
pub fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    sonic_rs::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))
}

/// Loads the navigation bar of a logged in session: its username and the
/// channels it subscribes to, newest subscription first.
pub async fn navbar(state: &AppState, session: &Session) -> Result<Navbar> {
    let username = session.username().await;

    let rest = &state.rest;
    let name = username.as_str();
    let subscriptions = call_with_refresh(session, rest, move |token| async move {
        rest.get_feed_subscriptions(name, &token).await
    })
    .await?;

    Ok(Navbar {
        subscriptions: subscriptions.into_values().rev().collect(),
        username,
    })
}

/// Parses a post identifier from a path segment. Anything but a positive
/// integer is treated as a missing post.
pub fn parse_post_id(raw: &str) -> Result<u64> {
    match raw.parse::<u64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(AppError::NotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Page {
        page: u32,
    }

    #[test]
    fn post_ids_must_be_positive_integers() {
        assert_eq!(parse_post_id("42").unwrap(), 42);
        assert!(matches!(parse_post_id("0"), Err(AppError::NotFound)));
        assert!(matches!(parse_post_id("-3"), Err(AppError::NotFound)));
        assert!(matches!(parse_post_id("abc"), Err(AppError::NotFound)));
    }

    #[test]
    fn malformed_json_is_a_bad_request() {
        assert_eq!(parse_json::<Page>(br#"{"page": 3}"#).unwrap().page, 3);
        assert!(matches!(
            parse_json::<Page>(b"{page"),
            Err(AppError::BadRequest(_))
        ));
    }
}
