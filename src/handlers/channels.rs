use axum::{
    Extension,
    extract::{Path, State},
    response::Html,
};

use crate::{
    error::Result,
    handlers::common::{navbar, render},
    services::session::Session,
    state::AppState,
    templates::ChannelPage,
};

/// Shows a channel and the posts published on it.
pub async fn view_channel(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(channel_username): Path<String>,
) -> Result<Html<String>> {
    let navbar = navbar(&state, &session).await?;
    let channel = state.rest.get_channel(&channel_username).await?;
    let posts = state.rest.get_channel_posts(&channel_username).await?;

    render(&ChannelPage {
        navbar,
        channel,
        posts,
    })
}
