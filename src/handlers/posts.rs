use std::collections::HashMap;

use axum::{
    Extension,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    error::Result,
    handlers::common::{navbar, parse_json, parse_post_id, render},
    rest::{
        client::UpstreamError,
        entities::{Comment, User},
    },
    services::{auth::call_with_refresh, csrf, session::Session},
    state::AppState,
    templates::{CommentBoard, CommentForm, PostEntry, PostPage, ThreadedComment},
};

/// A comment submitted from the comment form.
#[derive(Debug, Deserialize)]
pub struct CommentSubmission {
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub csrf: String,
}

/// A request for one page of a post's comments.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardRequest {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
}

/// Orders comments into threads: each comment is followed by its replies, depth
/// first. Replies whose parent is not among `comments` start their own thread.
pub fn thread_comments(comments: Vec<Comment>) -> Vec<(Comment, usize)> {
    let ids: Vec<i64> = comments.iter().map(|c| c.id as i64).collect();
    let mut roots = Vec::new();
    let mut replies: HashMap<i64, Vec<Comment>> = HashMap::new();

    for comment in comments {
        if comment.is_top_level() || !ids.contains(&comment.reply_to) {
            roots.push(comment);
        } else {
            replies.entry(comment.reply_to).or_default().push(comment);
        }
    }

    let mut threaded = Vec::new();
    let mut stack: Vec<(Comment, usize)> = roots.into_iter().rev().map(|c| (c, 0)).collect();
    while let Some((comment, depth)) = stack.pop() {
        if let Some(children) = replies.remove(&(comment.id as i64)) {
            stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
        }
        threaded.push((comment, depth));
    }
    threaded
}

/// Renders the comment form with a freshly issued CSRF token.
async fn comment_form(
    state: &AppState,
    session: &Session,
    post_id: u64,
    comment: String,
    error: &str,
) -> Result<String> {
    let form = CommentForm {
        post_id,
        csrf: csrf::issue_for_session(&state.config, session).await?,
        comment,
        error: error.to_string(),
    };
    Ok(render(&form)?.0)
}

/// Shows a post with its releases and the comment form.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `session` - The logged in session.
/// * `id` - The post identifier from the path.
///
/// # Returns
///
/// The post page, or the 404 page when the identifier is invalid or the post
/// does not exist.
pub async fn view_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<Html<String>> {
    let id = parse_post_id(&id)?;
    let navbar = navbar(&state, &session).await?;

    let post = state.rest.get_post(id).await?;
    let releases = state.rest.get_post_releases(&post).await?;
    let comment_form = comment_form(&state, &session, id, String::new(), "").await?;

    render(&PostPage {
        navbar,
        entry: PostEntry::new(post, releases),
        comment_form,
    })
}

/// Adds a comment to a post.
///
/// A submission with a stale CSRF token, or an empty comment, gets a 400 with
/// the comment form re-rendered around the submitted text.
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response> {
    let id = parse_post_id(&id)?;
    let submission: CommentSubmission = parse_json(&body)?;

    if !csrf::verify_submission(&state.config, &session, &submission.csrf).await {
        tracing::warn!("🛡️ CSRF token mismatch on comment");
        let form = comment_form(&state, &session, id, submission.comment, "Please Try Again.").await?;
        return Ok((StatusCode::BAD_REQUEST, Html(form)).into_response());
    }

    if submission.comment.trim().is_empty() {
        let form = comment_form(&state, &session, id, submission.comment, "Write something first.").await?;
        return Ok((StatusCode::BAD_REQUEST, Html(form)).into_response());
    }

    let comment = Comment {
        origin_post: id,
        commenter: session.username().await,
        content: submission.comment,
        reply_to: Comment::TOP_LEVEL,
        ..Default::default()
    };

    let rest = &state.rest;
    let comment = &comment;
    let added = call_with_refresh(&session, rest, move |token| async move {
        rest.add_comment(id, comment, &token).await
    })
    .await?;
    tracing::info!("💬 Comment {} added to post {}", added.id, id);

    let form = comment_form(&state, &session, id, String::new(), "").await?;
    Ok(Html(form).into_response())
}

/// Renders one page of a post's comments, threaded by reply.
pub async fn comment_board(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Html<String>> {
    let id = parse_post_id(&id)?;
    let request: BoardRequest = parse_json(&body)?;

    let comments = state
        .rest
        .get_comments(id, request.page, request.per_page)
        .await?;

    let mut commenters: HashMap<String, User> = HashMap::new();
    let mut threaded = Vec::new();
    for (comment, depth) in thread_comments(comments) {
        if !commenters.contains_key(&comment.commenter) {
            let user = match state.rest.get_user(&comment.commenter).await {
                Ok(user) => user,
                Err(UpstreamError::NotFound(_)) => User {
                    username: comment.commenter.clone(),
                    ..Default::default()
                },
                Err(e) => return Err(e.into()),
            };
            commenters.insert(comment.commenter.clone(), user);
        }
        let commenter = commenters
            .get(&comment.commenter)
            .cloned()
            .unwrap_or_default();
        threaded.push(ThreadedComment {
            comment,
            commenter,
            depth,
        });
    }

    render(&CommentBoard { comments: threaded })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: u64, reply_to: i64) -> Comment {
        Comment {
            id,
            reply_to,
            ..Default::default()
        }
    }

    #[test]
    fn replies_follow_their_parent() {
        let threaded = thread_comments(vec![
            comment(1, -1),
            comment(2, -1),
            comment(3, 1),
            comment(4, 3),
            comment(5, 1),
        ]);

        let order: Vec<(u64, usize)> = threaded.iter().map(|(c, d)| (c.id, *d)).collect();
        assert_eq!(order, vec![(1, 0), (3, 1), (4, 2), (5, 1), (2, 0)]);
    }

    #[test]
    fn orphaned_replies_start_threads() {
        let threaded = thread_comments(vec![comment(7, 3), comment(8, 7)]);

        let order: Vec<(u64, usize)> = threaded.iter().map(|(c, d)| (c.id, *d)).collect();
        assert_eq!(order, vec![(7, 0), (8, 1)]);
    }
}
