use reqwest::Method;

use super::client::{Failure, RestClient, UpstreamError};
use super::entities::SearchResults;
use super::feed::page_query;

impl RestClient {
    /// Searches posts, releases, comments, channels and users for `pattern`,
    /// ranked by relevance.
    pub async fn search(
        &self,
        pattern: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchResults, UpstreamError> {
        let mut query = page_query(page, per_page);
        if !pattern.is_empty() {
            query.push(("pattern", pattern.to_string()));
        }
        query.push(("sort", "rank".to_string()));

        let request = self.request(Method::GET, &["search"], None).query(&query);
        self.send::<SearchResults>(request)
            .await?
            .into_data(Failure::into_error)
    }
}
