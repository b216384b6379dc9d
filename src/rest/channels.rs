use reqwest::Method;

use super::client::{RestClient, UpstreamError};
use super::entities::{Channel, Post};

impl RestClient {
    pub async fn get_channel(&self, channel_username: &str) -> Result<Channel, UpstreamError> {
        let request = self.request(Method::GET, &["channels", channel_username], None);
        self.send::<Channel>(request)
            .await?
            .into_data(|_| UpstreamError::NotFound(format!("channel {channel_username}")))
    }

    /// Gets the posts published on a channel.
    pub async fn get_channel_posts(
        &self,
        channel_username: &str,
    ) -> Result<Vec<Post>, UpstreamError> {
        let request = self.request(Method::GET, &["channels", channel_username, "Posts"], None);
        self.send::<Vec<Post>>(request)
            .await?
            .into_data(|_| UpstreamError::NotFound(format!("posts of {channel_username}")))
    }
}
