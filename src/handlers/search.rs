use axum::{
    Extension,
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;

use crate::{
    error::Result,
    handlers::common::{navbar, render},
    services::session::Session,
    state::AppState,
    templates::SearchPage,
};

const RESULTS_PER_PAGE: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub page: u32,
}

/// Searches posts, releases, comments, channels and users.
pub async fn search(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>> {
    let navbar = navbar(&state, &session).await?;
    let pattern = query.pattern.trim().to_string();
    let results = state
        .rest
        .search(&pattern, query.page, RESULTS_PER_PAGE)
        .await?;
    tracing::debug!("🔍 Search for {:?}", pattern);

    render(&SearchPage {
        navbar,
        pattern,
        results,
    })
}
