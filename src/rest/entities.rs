use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stream of posts users can subscribe to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Channel {
    pub channel_username: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "pictureURL")]
    pub picture_url: String,
    pub owner_username: String,
    pub admin_usernames: Vec<String>,
    #[serde(rename = "postIDs")]
    pub post_ids: Vec<u64>,
    #[serde(rename = "stickiedPostIDs")]
    pub stickied_post_ids: Vec<u64>,
    #[serde(rename = "releaseIDs")]
    pub release_ids: Vec<u64>,
    #[serde(rename = "officialReleaseIDs")]
    pub official_release_ids: Vec<u64>,
    pub creation_time: Option<DateTime<Utc>>,
}

/// A comment on a post. `reply_to` is the id of the parent comment, or `-1`
/// for a reply to the post itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Comment {
    pub id: u64,
    pub origin_post: u64,
    pub commenter: String,
    pub content: String,
    pub reply_to: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
}

impl Comment {
    /// Marker for comments that reply to the post rather than another comment.
    pub const TOP_LEVEL: i64 = -1;

    pub fn is_top_level(&self) -> bool {
        self.reply_to == Self::TOP_LEVEL
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Post {
    pub id: u64,
    #[serde(rename = "PostedByUsername")]
    pub posted_by_username: String,
    pub origin_channel: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "contentsID")]
    pub contents_id: Vec<u64>,
    pub stars: HashMap<String, i64>,
    #[serde(rename = "commentsID")]
    pub comments_id: Vec<u64>,
    pub creation_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    Image,
    #[default]
    Text,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Other {
    pub authors: Vec<String>,
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Metadata {
    pub title: String,
    pub release_date: Option<DateTime<Utc>>,
    pub genre_defining: String,
    pub description: String,
    pub other: Other,
}

/// An atomic work of creativity attached to posts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Release {
    pub id: u64,
    pub owner_channel: String,
    #[serde(rename = "type")]
    pub kind: ReleaseType,
    /// Text body, or the image location for image releases.
    pub content: String,
    pub metadata: Metadata,
    pub creation_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    pub bio: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(rename = "pictureURL")]
    pub picture_url: String,
}

/// Sort order of feed posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSorting {
    /// By star count.
    Top,
    /// By comment count.
    Hot,
    /// By creation time.
    New,
    /// Whatever the feed owner configured.
    #[default]
    #[serde(rename = "")]
    NotSet,
}

impl FeedSorting {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedSorting::Top => "top",
            FeedSorting::Hot => "hot",
            FeedSorting::New => "new",
            FeedSorting::NotSet => "",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchResults {
    #[serde(rename = "Posts")]
    pub posts: Vec<Post>,
    #[serde(rename = "Releases")]
    pub releases: Vec<Release>,
    #[serde(rename = "Comments")]
    pub comments: Vec<Comment>,
    #[serde(rename = "Channels")]
    pub channels: Vec<Channel>,
    #[serde(rename = "Users")]
    pub users: Vec<User>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
            && self.releases.is_empty()
            && self.comments.is_empty()
            && self.channels.is_empty()
            && self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_decodes_wire_names() {
        let post: Post = sonic_rs::from_str(
            r#"{"id":7,"PostedByUsername":"loveless","originChannel":"chan",
                "contentsID":[1,2],"commentsID":[],"stars":{"loveless":5},
                "creationTime":"2020-01-31T10:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(post.id, 7);
        assert_eq!(post.posted_by_username, "loveless");
        assert_eq!(post.contents_id, vec![1, 2]);
        assert_eq!(post.stars.get("loveless"), Some(&5));
        assert!(post.creation_time.is_some());
        assert!(post.title.is_empty());
    }

    #[test]
    fn release_and_comment_tolerate_missing_fields() {
        let release: Release =
            sonic_rs::from_str(r#"{"id":3,"type":"image","content":"/img.png"}"#).unwrap();
        assert_eq!(release.kind, ReleaseType::Image);
        assert!(release.metadata.other.authors.is_empty());

        let comment: Comment =
            sonic_rs::from_str(r#"{"id":1,"commenter":"a","content":"hi","replyTo":-1}"#).unwrap();
        assert!(comment.is_top_level());
    }

    #[test]
    fn user_omits_empty_password() {
        let user = User {
            username: "loveless".into(),
            ..Default::default()
        };
        let json = sonic_rs::to_string(&user).unwrap();
        assert!(!json.contains("password"));
        assert!(json.contains(r#""username":"loveless""#));
    }
}
