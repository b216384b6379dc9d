use std::collections::BTreeMap;

use reqwest::Method;

use super::client::{Failure, RestClient, UpstreamError, limit_offset};
use super::entities::{Channel, FeedSorting, Post};

/// Builds the `limit`/`offset` query, omitted entirely when both are zero.
pub(crate) fn page_query(page: u32, per_page: u32) -> Vec<(&'static str, String)> {
    let (limit, offset) = limit_offset(page, per_page);
    if limit == 0 && offset == 0 {
        return Vec::new();
    }
    vec![("limit", limit.to_string()), ("offset", offset.to_string())]
}

impl RestClient {
    /// Gets a page of posts from the feed of `username`.
    pub async fn get_feed_posts(
        &self,
        username: &str,
        sorting: FeedSorting,
        page: u32,
        per_page: u32,
        token: &str,
    ) -> Result<Vec<Post>, UpstreamError> {
        let mut query = page_query(page, per_page);
        if sorting != FeedSorting::NotSet {
            query.push(("sort", sorting.as_str().to_string()));
        }

        let request = self
            .request(Method::GET, &["users", username, "feed", "posts"], Some(token))
            .query(&query);
        self.send::<Vec<Post>>(request)
            .await?
            .into_data(Failure::into_error)
    }

    /// Gets the channels `username` subscribes to, keyed by subscription time,
    /// newest subscriptions first on the wire.
    pub async fn get_feed_subscriptions(
        &self,
        username: &str,
        token: &str,
    ) -> Result<BTreeMap<String, Channel>, UpstreamError> {
        let request = self
            .request(Method::GET, &["users", username, "feed", "channels"], Some(token))
            .query(&[("sort", "sub-time_dsc")]);
        self.send::<BTreeMap<String, Channel>>(request)
            .await?
            .into_data(|_| UpstreamError::NotFound(format!("feed of {username}")))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::{
        Router,
        extract::Query,
        http::{StatusCode, header},
        response::IntoResponse,
        routing::get,
    };

    use super::*;
    use crate::rest::client::test_server;

    async fn posts(Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
        // echo the query back through the post titles
        let title = |k: &str| query.get(k).cloned().unwrap_or_default();
        let body = format!(
            r#"{{"status":"success","data":[{{"id":1,"title":"{}"}},{{"id":2,"title":"{}"}},{{"id":3,"title":"{}"}}]}}"#,
            title("limit"),
            title("offset"),
            title("sort")
        );
        (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], body)
    }

    #[tokio::test]
    async fn feed_posts_send_pagination_and_sorting() {
        let app = Router::new().route("/users/{username}/feed/posts", get(posts));
        let base = test_server::spawn(app).await;
        let client = RestClient::new(&base, Duration::from_secs(5)).unwrap();

        let posts = client
            .get_feed_posts("loveless", FeedSorting::Hot, 3, 5, "t")
            .await
            .unwrap();
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["5", "10", "hot"]);

        let posts = client
            .get_feed_posts("loveless", FeedSorting::NotSet, 0, 0, "t")
            .await
            .unwrap();
        assert!(posts.iter().all(|p| p.title.is_empty()));
    }

    #[tokio::test]
    async fn subscriptions_decode_keyed_by_time() {
        let app = Router::new().route(
            "/users/{username}/feed/channels",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "application/json")],
                    r#"{"status":"success","data":{"2020-01-01T00:00:00Z":{"channelUsername":"chan","name":"Chan"}}}"#,
                )
            }),
        );
        let base = test_server::spawn(app).await;
        let client = RestClient::new(&base, Duration::from_secs(5)).unwrap();

        let subs = client.get_feed_subscriptions("loveless", "t").await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs.values().next().unwrap().channel_username, "chan");
    }

    #[test]
    fn empty_page_query_is_omitted() {
        assert!(page_query(0, 0).is_empty());
        assert_eq!(
            page_query(2, 10),
            vec![("limit", "10".to_string()), ("offset", "10".to_string())]
        );
    }
}
