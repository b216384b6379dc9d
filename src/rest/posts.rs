use reqwest::Method;

use super::client::{RestClient, UpstreamError};
use super::entities::{Post, Release};

impl RestClient {
    /// Gets the post under `id`.
    pub async fn get_post(&self, id: u64) -> Result<Post, UpstreamError> {
        let id = id.to_string();
        let request = self.request(Method::GET, &["posts", &id], None);
        self.send::<Post>(request)
            .await?
            .into_data(|_| UpstreamError::NotFound(format!("post {id}")))
    }

    /// Gets the release under `id`.
    pub async fn get_release(&self, id: u64) -> Result<Release, UpstreamError> {
        let id = id.to_string();
        let request = self.request(Method::GET, &["releases", &id], None);
        self.send::<Release>(request)
            .await?
            .into_data(|_| UpstreamError::NotFound(format!("release {id}")))
    }

    /// Gets every release a post is made of, in post order.
    pub async fn get_post_releases(&self, post: &Post) -> Result<Vec<Release>, UpstreamError> {
        let mut releases = Vec::with_capacity(post.contents_id.len());
        for id in &post.contents_id {
            releases.push(self.get_release(*id).await?);
        }
        Ok(releases)
    }
}
