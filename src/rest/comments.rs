use http::StatusCode;
use reqwest::Method;

use super::client::{Failure, RestClient, UpstreamError};
use super::entities::Comment;
use super::feed::page_query;

impl RestClient {
    /// Adds a comment to the post under `post_id` as the owner of `token`.
    pub async fn add_comment(
        &self,
        post_id: u64,
        comment: &Comment,
        token: &str,
    ) -> Result<Comment, UpstreamError> {
        let post = post_id.to_string();
        let request = Self::with_json(
            self.request(Method::POST, &["posts", &post, "comments"], Some(token)),
            comment,
        )?;
        self.send::<Comment>(request)
            .await?
            .into_data(|failure| match failure.status {
                StatusCode::NOT_FOUND => UpstreamError::NotFound(format!("post {post}")),
                _ => failure.into_error(),
            })
    }

    /// Gets a page of the comments on the post under `post_id`.
    pub async fn get_comments(
        &self,
        post_id: u64,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Comment>, UpstreamError> {
        let post = post_id.to_string();
        let request = self
            .request(Method::GET, &["posts", &post, "comments"], None)
            .query(&page_query(page, per_page));
        self.send::<Vec<Comment>>(request)
            .await?
            .into_data(Failure::into_error)
    }
}
