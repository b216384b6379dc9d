use axum::{Extension, body::Bytes, extract::State, response::Html};
use serde::Deserialize;

use crate::{
    error::Result,
    handlers::common::{navbar, parse_json, render},
    rest::entities::FeedSorting,
    services::{auth::call_with_refresh, session::Session},
    state::AppState,
    templates::{HomePage, PostEntry, PostList},
};

/// A request for one page of the feed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedRequest {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub sorting: FeedSorting,
}

pub async fn home(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>> {
    let navbar = navbar(&state, &session).await?;
    render(&HomePage { navbar })
}

/// Renders one page of the user's feed, each post with its releases.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `session` - The logged in session.
/// * `body` - A JSON [`FeedRequest`].
pub async fn feed(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    body: Bytes,
) -> Result<Html<String>> {
    let FeedRequest {
        page,
        per_page,
        sorting,
    } = parse_json(&body)?;
    let username = session.username().await;

    let rest = &state.rest;
    let name = username.as_str();
    let posts = call_with_refresh(&session, rest, move |token| async move {
        rest.get_feed_posts(name, sorting, page, per_page, &token)
            .await
    })
    .await?;

    let mut entries = Vec::with_capacity(posts.len());
    for post in posts {
        let releases = state.rest.get_post_releases(&post).await?;
        entries.push(PostEntry::new(post, releases));
    }

    tracing::debug!("📰 Feed page {} with {} posts", page, entries.len());
    render(&PostList { entries })
}
