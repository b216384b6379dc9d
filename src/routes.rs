use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_cookies::CookieManagerLayer;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    error::AppError,
    handlers::{account, channels, front, home, posts, search},
    middleware_layer::session::{require_login, start_session},
    state::AppState,
};

/// The largest request body accepted. Forms and JSON requests are small.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Builds the application router.
///
/// # Arguments
///
/// * `state` - The application state.
///
/// # Returns
///
/// The router serving every page, fragment and static asset.
pub fn build_router(state: AppState) -> Router {
    let mut login_routes = Router::new()
        .route("/login", post(front::login))
        .route("/signup", post(front::signup));

    let rate = state.config.login_rate_limit_per_second;
    if rate > 0 {
        let governor_conf = GovernorConfigBuilder::default()
            .per_millisecond((1000 / rate).max(1))
            .burst_size(rate.min(u32::MAX as u64) as u32)
            .use_headers()
            .finish();
        match governor_conf {
            Some(conf) => {
                login_routes = login_routes.layer(GovernorLayer::new(Arc::new(conf)));
                tracing::info!("✅ Login rate limit: {} requests per second", rate);
            }
            None => tracing::warn!("⚠️ Invalid login rate limit {}, not applied", rate),
        }
    }

    let public_routes = Router::new()
        .route("/", get(front::index))
        .route("/logout", get(front::logout))
        .route("/posts/{id}/comment-board", post(posts::comment_board))
        .merge(login_routes)
        .route_layer(from_fn_with_state(state.clone(), start_session))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/home", get(home::home))
        .route("/home/feed", post(home::feed))
        .route("/posts/{id}", get(posts::view_post))
        .route("/posts/{id}/comments", post(posts::add_comment))
        .route("/channels/{username}", get(channels::view_channel))
        .route("/account", get(account::account))
        .route("/search", get(search::search))
        .route_layer(from_fn_with_state(state.clone(), require_login))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/assets", ServeDir::new(&state.config.asset_dir))
        .fallback(|| async { AppError::NotFound })
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(CookieManagerLayer::new())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::{Body, to_bytes},
        http::{HeaderMap, Request, StatusCode, header},
        response::{IntoResponse, Response},
        routing::{get, post},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::config::tests::test_config;
    use crate::repositories::memory_session::MemorySessionStore;
    use crate::rest::client::{RestClient, test_server};

    fn envelope(status: StatusCode, body: &'static str) -> impl IntoResponse {
        (status, [(header::CONTENT_TYPE, "application/json")], body)
    }

    /// An upstream that accepts loveless/hunter22 and knows one subscription.
    async fn upstream() -> String {
        let app = Router::new()
            .route(
                "/token-auth",
                post(|body: String| async move {
                    if body.contains("hunter22") {
                        envelope(StatusCode::OK, r#"{"status":"success","data":{"token":"t1"}}"#)
                    } else {
                        envelope(StatusCode::UNAUTHORIZED, r#"{"status":"fail","data":{}}"#)
                    }
                }),
            )
            .route(
                "/users/{username}/feed/channels",
                get(|headers: HeaderMap| async move {
                    if headers.get(header::AUTHORIZATION).is_some_and(|v| v == "Bearer t1") {
                        envelope(
                            StatusCode::OK,
                            r#"{"status":"success","data":{"2024-01-01T00:00:00Z":{"channelUsername":"rust","name":"Rustaceans"}}}"#,
                        )
                    } else {
                        envelope(StatusCode::UNAUTHORIZED, r#"{"status":"fail","data":{}}"#)
                    }
                }),
            )
            .route(
                "/logout",
                get(|| async { envelope(StatusCode::OK, r#"{"status":"success","data":null}"#) }),
            );
        test_server::spawn(app).await
    }

    /// An upstream that hands out tokens it never accepts again, not even for a refresh.
    async fn revoking_upstream() -> String {
        let denied = || async { envelope(StatusCode::UNAUTHORIZED, r#"{"status":"fail","data":{}}"#) };
        let app = Router::new()
            .route(
                "/token-auth",
                post(|| async {
                    envelope(StatusCode::OK, r#"{"status":"success","data":{"token":"t1"}}"#)
                }),
            )
            .route("/token-auth-refresh", get(denied))
            .route("/users/{username}/feed/channels", get(denied));
        test_server::spawn(app).await
    }

    async fn app() -> (Router, MemorySessionStore) {
        app_with(upstream().await).await
    }

    async fn app_with(upstream: String) -> (Router, MemorySessionStore) {
        let config = test_config();
        let store = MemorySessionStore::new();
        let rest = RestClient::new(&upstream, Duration::from_secs(5)).unwrap();
        let state = AppState::with_store(&config, Arc::new(store.clone()), rest);
        (build_router(state), store)
    }

    fn session_cookie(response: &Response) -> Option<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("I1Session=") && !v.starts_with("I1Session=;"))
            .map(|v| v.split(';').next().unwrap_or_default().to_string())
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn csrf_of(html: &str) -> String {
        let marker = r#"name="_csrf" value=""#;
        let start = html.find(marker).unwrap() + marker.len();
        let end = html[start..].find('"').unwrap();
        html[start..start + end].to_string()
    }

    async fn get_page(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        app.clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_form(app: &Router, uri: &str, cookie: &str, form: String) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn first_visit_gets_an_anonymous_session() {
        let (app, store) = app().await;

        let response = get_page(&app, "/", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response).unwrap();
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Strict"));
        assert_eq!(store.len(), 1);

        let again = get_page(&app, "/", Some(&cookie)).await;
        assert_eq!(again.status(), StatusCode::OK);
        assert_eq!(session_cookie(&again).unwrap(), cookie);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn logged_out_cookie_starts_a_fresh_session() {
        let (app, _store) = app().await;

        let first = get_page(&app, "/", None).await;
        let cookie = session_cookie(&first).unwrap();

        let logout = get_page(&app, "/logout", Some(&cookie)).await;
        assert_eq!(logout.status(), StatusCode::SEE_OTHER);
        assert_eq!(logout.headers()[header::LOCATION], "/");

        let after = get_page(&app, "/", Some(&cookie)).await;
        assert_ne!(session_cookie(&after).unwrap(), cookie);
    }

    #[tokio::test]
    async fn anonymous_home_redirects_to_front_page() {
        let (app, _store) = app().await;

        let response = get_page(&app, "/home", None).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
    }

    #[tokio::test]
    async fn csrf_mismatch_rerenders_login_form() {
        let (app, _store) = app().await;
        let front = get_page(&app, "/", None).await;
        let cookie = session_cookie(&front).unwrap();
        let issued = csrf_of(&body_text(front).await);

        let response = post_form(
            &app,
            "/login",
            &cookie,
            "username=loveless&password=hunter22&_csrf=forged".to_string(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Please Try Again."));
        assert_ne!(csrf_of(&html), issued);
    }

    #[tokio::test]
    async fn login_renews_session_and_opens_home() {
        let (app, _store) = app().await;
        let front = get_page(&app, "/", None).await;
        let anonymous = session_cookie(&front).unwrap();
        let csrf = csrf_of(&body_text(front).await);

        let response = post_form(
            &app,
            "/login",
            &anonymous,
            format!("username=loveless&password=hunter22&_csrf={csrf}"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/home");
        let logged_in = session_cookie(&response).unwrap();
        assert_ne!(logged_in, anonymous);

        let home = get_page(&app, "/home", Some(&logged_in)).await;
        assert_eq!(home.status(), StatusCode::OK);
        let html = body_text(home).await;
        assert!(html.contains("loveless"));
        assert!(html.contains("Rustaceans"));

        let front_again = get_page(&app, "/", Some(&logged_in)).await;
        assert_eq!(front_again.status(), StatusCode::SEE_OTHER);
        assert_eq!(front_again.headers()[header::LOCATION], "/home");
    }

    #[tokio::test]
    async fn revoked_token_logs_out_instead_of_looping() {
        let (app, _store) = app_with(revoking_upstream().await).await;
        let front = get_page(&app, "/", None).await;
        let anonymous = session_cookie(&front).unwrap();
        let csrf = csrf_of(&body_text(front).await);
        let login = post_form(
            &app,
            "/login",
            &anonymous,
            format!("username=loveless&password=hunter22&_csrf={csrf}"),
        )
        .await;
        let cookie = session_cookie(&login).unwrap();

        let mut uri = "/home".to_string();
        let mut hops = Vec::new();
        let landed = loop {
            let response = get_page(&app, &uri, Some(&cookie)).await;
            if response.status() != StatusCode::SEE_OTHER {
                break response;
            }
            let next = response.headers()[header::LOCATION].to_str().unwrap().to_string();
            hops.push(format!("{uri} -> {next}"));
            assert!(hops.len() < 4, "redirect loop: {hops:?}");
            uri = next;
        };

        assert_eq!(hops, vec!["/home -> /"]);
        assert_eq!(landed.status(), StatusCode::OK);
        let html = body_text(landed).await;
        assert!(html.contains(r#"action="/login""#));
    }

    #[tokio::test]
    async fn wrong_password_is_reported_inline() {
        let (app, _store) = app().await;
        let front = get_page(&app, "/", None).await;
        let cookie = session_cookie(&front).unwrap();
        let csrf = csrf_of(&body_text(front).await);

        let response = post_form(
            &app,
            "/login",
            &cookie,
            format!("username=loveless&password=wrong&_csrf={csrf}"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Your username or password is wrong"));
    }

    #[tokio::test]
    async fn malformed_comment_board_request_is_rejected() {
        let (app, _store) = app().await;

        let request = Request::builder()
            .method("POST")
            .uri("/posts/1/comment-board")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{page"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_paths_render_not_found() {
        let (app, _store) = app().await;

        let response = get_page(&app, "/nowhere", None).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("404"));
    }
}
