use axum::{Extension, extract::State, response::Html};

use crate::{
    error::Result,
    handlers::common::{navbar, render},
    services::{auth::call_with_refresh, session::Session},
    state::AppState,
    templates::AccountPage,
};

/// Shows the logged in user's profile and bookmarks.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `session` - The logged in session.
///
/// # Returns
///
/// The account page, bookmarks newest first.
pub async fn account(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>> {
    let navbar = navbar(&state, &session).await?;

    let rest = &state.rest;
    let name = navbar.username.as_str();
    let user = call_with_refresh(&session, rest, move |token| async move {
        rest.get_user_authorized(name, &token).await
    })
    .await?;
    let bookmarks = call_with_refresh(&session, rest, move |token| async move {
        rest.get_user_bookmarks(name, &token).await
    })
    .await?;

    render(&AccountPage {
        user,
        bookmarks: bookmarks.into_values().rev().collect(),
        navbar,
    })
}
