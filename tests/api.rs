mod support;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};

use support::TestApp;

fn ids(items: &Value) -> Vec<i64> {
    items
        .as_array()
        .expect("json array")
        .iter()
        .map(|item| item["id"].as_i64().expect("numeric id"))
        .collect()
}

#[tokio::test]
async fn service_routes_answer() {
    let app = TestApp::new();

    let (status, body) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().is_some());

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn register_rejects_duplicates_and_hides_password() {
    let app = TestApp::new();
    let payload = json!({
        "username": "ada",
        "email": "ada@example.com",
        "password": "analytical"
    });

    let (status, body) = app
        .send(Method::POST, "/api/auth/register", None, Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "ada");
    assert!(body.get("password_hash").is_none());
    assert!(body.get("password").is_none());

    let (status, body) = app
        .send(Method::POST, "/api/auth/register", None, Some(payload))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Username already registered");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "username": "lovelace",
                "email": "ada@example.com",
                "password": "analytical"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Email already registered");
}

#[tokio::test]
async fn register_validates_payload() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"username": "ab", "email": "nope", "password": "123"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_failed");
}

#[tokio::test]
async fn login_accepts_form_and_json_but_not_other_types() {
    let app = TestApp::new();
    app.user_with_password("grace", "hopper42").await;

    let form = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=grace&password=hopper42"))
        .expect("request");
    let (status, body) = app.dispatch(form).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    let token = body["access_token"].as_str().expect("token").to_string();

    let (status, me) = app.get("/api/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "grace");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "grace", "password": "hopper42"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let text = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("grace:hopper42"))
        .expect("request");
    let (status, _) = app.dispatch(text).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "grace"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_is_unauthorized_with_challenge() {
    let app = TestApp::new();
    app.user_with_password("grace", "hopper42").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"username":"grace","password":"wrong"}"#))
        .expect("request");
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .expect("router is infallible");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|value| value.to_str().ok()),
        Some("Bearer")
    );
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn protected_routes_require_a_valid_active_user() {
    let app = TestApp::new();

    let (status, _) = app.get("/api/users/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/users/me", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let dormant = app.repos.seed_user("dormant", false, false).await;
    let token = app
        .state
        .auth
        .issue_token(&dormant.username)
        .expect("token");
    let (status, body) = app.get("/api/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Inactive user");
}

#[tokio::test]
async fn users_can_be_looked_up_and_updated() {
    let app = TestApp::new();
    let (alice, alice_token) = app.user("alice").await;
    let (_bob, bob_token) = app.user("bob").await;

    let (status, body) = app
        .get(&format!("/api/users/{}", alice.id), Some(&bob_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");

    let (status, _) = app.get("/api/users/9999", Some(&bob_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .put(
            "/api/users/me",
            &bob_token,
            json!({"email": "alice@example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Email already registered");

    let (status, body) = app
        .put(
            "/api/users/me",
            &alice_token,
            json!({"full_name": "Alice Liddell"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Alice Liddell");
}

#[tokio::test]
async fn drafts_are_visible_only_to_their_author() {
    let app = TestApp::new();
    let (_author, author_token) = app.user("author").await;
    let (_reader, reader_token) = app.user("reader").await;

    let (status, draft) = app
        .post(
            "/api/posts",
            &author_token,
            json!({"title": "Draft", "content": "not yet", "is_published": false}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(draft["published_at"].is_null());
    let id = draft["id"].as_i64().expect("id");

    let (status, list) = app.get("/api/posts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(ids(&list).is_empty());

    let (status, body) = app.get(&format!("/api/posts/{id}"), Some(&author_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Draft");

    // Warm the detail cache as the author, then ask as somebody else.
    let (status, _) = app.get(&format!("/api/posts/{id}"), Some(&reader_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get(&format!("/api/posts/{id}"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, mine) = app.get("/api/posts/me", Some(&author_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&mine), vec![id]);
}

#[tokio::test]
async fn only_the_author_may_edit_or_delete() {
    let app = TestApp::new();
    let (_author, author_token) = app.user("author").await;
    let (_other, other_token) = app.user("other").await;

    let (_, post) = app
        .post(
            "/api/posts",
            &author_token,
            json!({"title": "Mine", "content": "body", "is_published": true}),
        )
        .await;
    let id = post["id"].as_i64().expect("id");

    let (status, _) = app
        .put(&format!("/api/posts/{id}"), &other_token, json!({"title": "Theirs"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&format!("/api/posts/{id}"), &other_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.delete(&format!("/api/posts/{id}"), &author_token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = app.get(&format!("/api/posts/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn published_at_is_set_once() {
    let app = TestApp::new();
    let (_author, token) = app.user("author").await;

    let (_, post) = app
        .post(
            "/api/posts",
            &token,
            json!({"title": "Later", "content": "body"}),
        )
        .await;
    let id = post["id"].as_i64().expect("id");
    assert!(post["published_at"].is_null());

    let (_, published) = app
        .put(&format!("/api/posts/{id}"), &token, json!({"is_published": true}))
        .await;
    let first = published["published_at"].clone();
    assert!(first.is_string());

    let (_, hidden) = app
        .put(&format!("/api/posts/{id}"), &token, json!({"is_published": false}))
        .await;
    assert_eq!(hidden["published_at"], first);

    let (_, republished) = app
        .put(&format!("/api/posts/{id}"), &token, json!({"is_published": true}))
        .await;
    assert_eq!(republished["published_at"], first);
}

#[tokio::test]
async fn title_edit_leaves_publication_untouched() {
    let app = TestApp::new();
    let (_author, token) = app.user("author").await;

    let (_, post) = app
        .post(
            "/api/posts",
            &token,
            json!({"title": "Draft", "content": "body"}),
        )
        .await;
    let id = post["id"].as_i64().expect("id");

    let (_, published) = app
        .put(&format!("/api/posts/{id}"), &token, json!({"is_published": true}))
        .await;
    let first = published["published_at"].clone();

    let (status, edited) = app
        .put(&format!("/api/posts/{id}"), &token, json!({"title": "Edited"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["title"], "Edited");
    assert_eq!(edited["is_published"], true);
    assert_eq!(edited["published_at"], first);
    assert_eq!(edited["content"], "body");
}

#[tokio::test]
async fn post_list_filters_by_tag_and_search() {
    let app = TestApp::new();
    let (_admin, admin_token) = app.admin("admin").await;
    let (_author, token) = app.user("author").await;

    let (_, rust) = app
        .post("/api/tags", &admin_token, json!({"name": "rust"}))
        .await;
    let rust_id = rust["id"].as_i64().expect("id");

    let (_, tagged) = app
        .post(
            "/api/posts",
            &token,
            json!({"title": "Ownership", "content": "borrowck", "is_published": true, "tag_ids": [rust_id]}),
        )
        .await;
    let (_, plain) = app
        .post(
            "/api/posts",
            &token,
            json!({"title": "Gardening", "content": "Tomatoes", "is_published": true}),
        )
        .await;
    assert_eq!(tagged["tags"][0]["name"], "rust");

    let (_, by_tag) = app.get(&format!("/api/posts?tag_id={rust_id}"), None).await;
    assert_eq!(ids(&by_tag), vec![tagged["id"].as_i64().expect("id")]);

    let (_, by_search) = app.get("/api/posts?search=tomatoes", None).await;
    assert_eq!(ids(&by_search), vec![plain["id"].as_i64().expect("id")]);

    let (_, all) = app.get("/api/posts", None).await;
    assert_eq!(
        ids(&all),
        vec![
            plain["id"].as_i64().expect("id"),
            tagged["id"].as_i64().expect("id")
        ]
    );
}

#[tokio::test]
async fn pagination_bounds_are_enforced() {
    let app = TestApp::new();
    for uri in [
        "/api/posts?limit=0",
        "/api/posts?limit=101",
        "/api/posts?skip=-1",
        "/api/tags?limit=500",
    ] {
        let (status, body) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"]["code"], "invalid_pagination", "{uri}");
    }

    let (status, _) = app.get("/api/posts?limit=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tags_are_admin_managed() {
    let app = TestApp::new();
    let (_admin, admin_token) = app.admin("admin").await;
    let (_user, user_token) = app.user("user").await;

    let (status, _) = app
        .post("/api/tags", &user_token, json!({"name": "news"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, tag) = app
        .post("/api/tags", &admin_token, json!({"name": "news"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = tag["id"].as_i64().expect("id");

    let (status, body) = app
        .post("/api/tags", &admin_token, json!({"name": "news"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Tag name already exists");

    let (status, body) = app
        .put(
            &format!("/api/tags/{id}"),
            &admin_token,
            json!({"description": "Daily"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "news");
    assert_eq!(body["description"], "Daily");

    let (status, _) = app.get("/api/tags/424242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete(&format!("/api/tags/{id}"), &user_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&format!("/api/tags/{id}"), &admin_token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, tags) = app.get("/api/tags", None).await;
    assert!(ids(&tags).is_empty());
}

#[tokio::test]
async fn soft_deleted_comments_leave_lists_but_remain_addressable() {
    let app = TestApp::new();
    let (_author, token) = app.user("author").await;
    let (_other, other_token) = app.user("other").await;

    let (_, post) = app
        .post(
            "/api/posts",
            &token,
            json!({"title": "Talk", "content": "body", "is_published": true}),
        )
        .await;
    let post_id = post["id"].as_i64().expect("id");

    let (status, comment) = app
        .post(
            "/api/comments",
            &token,
            json!({"post_id": post_id, "content": "first!"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comment["author"]["username"], "author");
    let comment_id = comment["id"].as_i64().expect("id");

    let (status, _) = app
        .delete(&format!("/api/comments/{comment_id}"), &other_token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .delete(&format!("/api/comments/{comment_id}"), &token)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = app
        .get(&format!("/api/comments/post/{post_id}"), None)
        .await;
    assert!(ids(&list).is_empty());

    let (status, direct) = app
        .get(&format!("/api/comments/{comment_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(direct["is_active"], false);

    let (status, _) = app
        .put(
            &format!("/api/comments/{comment_id}"),
            &token,
            json!({"content": "edited"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_need_an_existing_post() {
    let app = TestApp::new();
    let (_user, token) = app.user("user").await;

    let (status, _) = app
        .post(
            "/api/comments",
            &token,
            json!({"post_id": 777, "content": "hello"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/comments/post/777", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post("/api/comments", &token, json!({"post_id": 777, "content": ""}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_failed");
}
