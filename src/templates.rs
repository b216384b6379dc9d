use askama::Template;

use crate::rest::entities::{Channel, Comment, Post, Release, ReleaseType, SearchResults, User};
use crate::validation::forms::{FormErrors, SignupForm};

/// The signed in user and their subscriptions, shown on every logged in page.
#[derive(Debug, Clone, Default)]
pub struct Navbar {
    pub username: String,
    pub subscriptions: Vec<Channel>,
}

/// A post with its releases and star total, as listed in feeds and pages.
#[derive(Debug, Clone, Default)]
pub struct PostEntry {
    pub post: Post,
    pub releases: Vec<Release>,
    pub stars: i64,
}

impl PostEntry {
    pub fn new(post: Post, releases: Vec<Release>) -> Self {
        let stars = post.stars.values().sum();
        Self {
            post,
            releases,
            stars,
        }
    }
}

/// A comment placed in its thread. `depth` is zero for top level comments.
#[derive(Debug, Clone, Default)]
pub struct ThreadedComment {
    pub comment: Comment,
    pub commenter: User,
    pub depth: usize,
}

impl ThreadedComment {
    /// The left indent of the comment in `em`.
    pub fn indent(&self) -> usize {
        self.depth * 2
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage<'a> {
    pub status: u16,
    pub reason: &'a str,
}

/// The front page with the login and signup forms.
#[derive(Template, Default)]
#[template(path = "front.html")]
pub struct FrontPage {
    pub csrf: String,
    pub login_username: String,
    pub login_errors: FormErrors,
    pub signup: SignupForm,
    pub signup_errors: FormErrors,
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomePage {
    pub navbar: Navbar,
}

/// A page of feed posts, fetched into the home page.
#[derive(Template)]
#[template(path = "post_list.html")]
pub struct PostList {
    pub entries: Vec<PostEntry>,
}

#[derive(Template)]
#[template(path = "post_view.html")]
pub struct PostPage {
    pub navbar: Navbar,
    pub entry: PostEntry,
    /// The rendered [`CommentForm`].
    pub comment_form: String,
}

/// The comment form under a post. Re-rendered on its own when a submission is refused.
#[derive(Template, Debug, Clone, Default)]
#[template(path = "comment_form.html")]
pub struct CommentForm {
    pub post_id: u64,
    pub csrf: String,
    pub comment: String,
    pub error: String,
}

#[derive(Template)]
#[template(path = "comment_board.html")]
pub struct CommentBoard {
    pub comments: Vec<ThreadedComment>,
}

#[derive(Template)]
#[template(path = "channel.html")]
pub struct ChannelPage {
    pub navbar: Navbar,
    pub channel: Channel,
    pub posts: Vec<Post>,
}

#[derive(Template)]
#[template(path = "account.html")]
pub struct AccountPage {
    pub navbar: Navbar,
    pub user: User,
    pub bookmarks: Vec<Post>,
}

#[derive(Template)]
#[template(path = "search.html")]
pub struct SearchPage {
    pub navbar: Navbar,
    pub pattern: String,
    pub results: SearchResults,
}
