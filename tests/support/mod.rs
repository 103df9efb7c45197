//! Shared fixtures for the integration suites: in-memory repositories, a
//! cache store that always fails, and a router harness.

#![allow(dead_code)]

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tower::ServiceExt;

use scrivo::application::auth::hash_password;
use scrivo::application::pagination::OffsetWindow;
use scrivo::application::repos::{
    CommentsRepo, CommentsWriteRepo, CreateCommentParams, CreatePostParams, CreateTagParams,
    CreateUserParams, PostListScope, PostQueryFilter, PostsRepo, PostsWriteRepo, RepoError,
    TagsRepo, TagsWriteRepo, UpdatePostParams, UpdateTagParams, UpdateUserParams, UsersRepo,
    UsersWriteRepo,
};
use scrivo::cache::{Cache, CacheError, CacheStore, CacheTtls, MemoryStore};
use scrivo::config::AuthSettings;
use scrivo::domain::entities::{CommentRecord, PostRecord, PostTagRecord, TagRecord, UserRecord};
use scrivo::domain::posts::resolve_published_at;
use scrivo::infra::http::{self, ApiState, Repositories, RouterState};

pub const TEST_SECRET: &str = "integration-test-secret";

#[derive(Default)]
struct Tables {
    users: Vec<UserRecord>,
    posts: Vec<PostRecord>,
    post_tags: Vec<(i64, i64)>,
    tags: Vec<TagRecord>,
    comments: Vec<CommentRecord>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// One adapter implementing every repository trait over shared tables.
#[derive(Default)]
pub struct InMemoryRepos {
    tables: Mutex<Tables>,
    post_list_reads: AtomicUsize,
    comment_list_reads: AtomicUsize,
    tag_list_reads: AtomicUsize,
}

impl InMemoryRepos {
    pub fn post_list_reads(&self) -> usize {
        self.post_list_reads.load(Ordering::SeqCst)
    }

    pub fn comment_list_reads(&self) -> usize {
        self.comment_list_reads.load(Ordering::SeqCst)
    }

    pub fn tag_list_reads(&self) -> usize {
        self.tag_list_reads.load(Ordering::SeqCst)
    }

    /// Insert a user directly, skipping password hashing.
    pub async fn seed_user(&self, username: &str, is_admin: bool, is_active: bool) -> UserRecord {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        let user = UserRecord {
            id,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            full_name: None,
            password_hash: "unusable".to_string(),
            is_active,
            is_admin,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };
        tables.users.push(user.clone());
        user
    }

    /// Rewrite a stored post behind the services' back, the way another
    /// writer would.
    pub async fn overwrite_post_title(&self, id: i64, title: &str) {
        let mut tables = self.tables.lock().await;
        if let Some(post) = tables.posts.iter_mut().find(|post| post.id == id) {
            post.title = title.to_string();
        }
    }
}

fn tags_of(tables: &Tables, post_id: i64) -> Vec<i64> {
    tables
        .post_tags
        .iter()
        .filter(|(post, _)| *post == post_id)
        .map(|(_, tag)| *tag)
        .collect()
}

fn matches_filter(tables: &Tables, post: &PostRecord, filter: &PostQueryFilter) -> bool {
    if let Some(tag_id) = filter.tag_id
        && !tags_of(tables, post.id).contains(&tag_id)
    {
        return false;
    }
    match filter.search.as_deref() {
        Some(term) => {
            let term = term.to_lowercase();
            post.title.to_lowercase().contains(&term)
                || post.content.to_lowercase().contains(&term)
                || post
                    .summary
                    .as_deref()
                    .is_some_and(|summary| summary.to_lowercase().contains(&term))
        }
        None => true,
    }
}

fn link_tags(tables: &mut Tables, post_id: i64, tag_ids: &[i64]) {
    tables.post_tags.retain(|(post, _)| *post != post_id);
    for tag_id in tag_ids {
        if tables.tags.iter().any(|tag| tag.id == *tag_id)
            && !tables.post_tags.contains(&(post_id, *tag_id))
        {
            tables.post_tags.push((post_id, *tag_id));
        }
    }
}

#[async_trait]
impl UsersRepo for InMemoryRepos {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|user| user.email == email).cloned())
    }

    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<UserRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .filter(|user| ids.contains(&user.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UsersWriteRepo for InMemoryRepos {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        if tables.users.iter().any(|user| user.email == params.email) {
            return Err(RepoError::Duplicate {
                constraint: "users_email_key".to_string(),
            });
        }
        let id = tables.next_id();
        let user = UserRecord {
            id,
            username: params.username,
            email: params.email,
            full_name: params.full_name,
            password_hash: params.password_hash,
            is_active: true,
            is_admin: false,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, params: UpdateUserParams) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .iter_mut()
            .find(|user| user.id == params.id)
            .ok_or(RepoError::NotFound)?;
        if let Some(email) = params.email {
            user.email = email;
        }
        if let Some(full_name) = params.full_name {
            user.full_name = Some(full_name);
        }
        if let Some(hash) = params.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = Some(OffsetDateTime::now_utc());
        Ok(user.clone())
    }

    async fn set_admin(&self, username: &str, is_admin: bool) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .iter_mut()
            .find(|user| user.username == username)
            .ok_or(RepoError::NotFound)?;
        user.is_admin = is_admin;
        Ok(user.clone())
    }
}

#[async_trait]
impl PostsRepo for InMemoryRepos {
    async fn list_posts(
        &self,
        scope: PostListScope,
        filter: &PostQueryFilter,
        window: OffsetWindow,
    ) -> Result<Vec<PostRecord>, RepoError> {
        self.post_list_reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().await;
        let mut posts: Vec<PostRecord> = tables
            .posts
            .iter()
            .filter(|post| match scope {
                PostListScope::Published => post.is_published,
                PostListScope::Author(author_id) => post.author_id == author_id,
            })
            .filter(|post| matches_filter(&tables, post, filter))
            .cloned()
            .collect();
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(window.apply(&posts))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.posts.iter().find(|post| post.id == id).cloned())
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryRepos {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        let post = PostRecord {
            id,
            title: params.title,
            content: params.content,
            summary: params.summary,
            is_published: params.is_published,
            published_at: params.published_at,
            author_id: params.author_id,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };
        tables.posts.push(post.clone());
        link_tags(&mut tables, id, &params.tag_ids);
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let post = tables
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        if let Some(title) = params.title {
            post.title = title;
        }
        if let Some(content) = params.content {
            post.content = content;
        }
        if params.summary.is_some() {
            post.summary = params.summary;
        }
        if let Some(is_published) = params.is_published {
            post.is_published = is_published;
        }
        post.published_at =
            resolve_published_at(post.published_at, post.is_published, params.now);
        post.updated_at = Some(params.now);
        let post = post.clone();
        if let Some(tag_ids) = params.tag_ids {
            link_tags(&mut tables, params.id, &tag_ids);
        }
        Ok(post)
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.posts.len();
        tables.posts.retain(|post| post.id != id);
        if tables.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        tables.post_tags.retain(|(post, _)| *post != id);
        tables.comments.retain(|comment| comment.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl TagsRepo for InMemoryRepos {
    async fn list_all(&self) -> Result<Vec<TagRecord>, RepoError> {
        self.tag_list_reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().await;
        let mut tags = tables.tags.clone();
        tags.sort_by_key(|tag| tag.id);
        Ok(tags)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<TagRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.tags.iter().find(|tag| tag.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<TagRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.tags.iter().find(|tag| tag.name == name).cloned())
    }

    async fn list_for_posts(&self, post_ids: &[i64]) -> Result<Vec<PostTagRecord>, RepoError> {
        let tables = self.tables.lock().await;
        let mut links: Vec<PostTagRecord> = tables
            .post_tags
            .iter()
            .filter(|(post, _)| post_ids.contains(post))
            .filter_map(|(post, tag_id)| {
                tables
                    .tags
                    .iter()
                    .find(|tag| tag.id == *tag_id)
                    .map(|tag| PostTagRecord {
                        post_id: *post,
                        tag: tag.clone(),
                    })
            })
            .collect();
        links.sort_by_key(|link| (link.post_id, link.tag.id));
        Ok(links)
    }
}

#[async_trait]
impl TagsWriteRepo for InMemoryRepos {
    async fn create_tag(&self, params: CreateTagParams) -> Result<TagRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables.tags.iter().any(|tag| tag.name == params.name) {
            return Err(RepoError::Duplicate {
                constraint: "tags_name_key".to_string(),
            });
        }
        let id = tables.next_id();
        let tag = TagRecord {
            id,
            name: params.name,
            description: params.description,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.tags.push(tag.clone());
        Ok(tag)
    }

    async fn update_tag(&self, params: UpdateTagParams) -> Result<TagRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let tag = tables
            .tags
            .iter_mut()
            .find(|tag| tag.id == params.id)
            .ok_or(RepoError::NotFound)?;
        tag.name = params.name;
        tag.description = params.description;
        Ok(tag.clone())
    }

    async fn delete_tag(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.tags.len();
        tables.tags.retain(|tag| tag.id != id);
        if tables.tags.len() == before {
            return Err(RepoError::NotFound);
        }
        tables.post_tags.retain(|(_, tag)| *tag != id);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for InMemoryRepos {
    async fn list_active_for_post(
        &self,
        post_id: i64,
        window: OffsetWindow,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        self.comment_list_reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().await;
        let mut comments: Vec<CommentRecord> = tables
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id && comment.is_active)
            .cloned()
            .collect();
        comments.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(window.apply(&comments))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<CommentRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .comments
            .iter()
            .find(|comment| comment.id == id)
            .cloned())
    }
}

#[async_trait]
impl CommentsWriteRepo for InMemoryRepos {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if !tables.posts.iter().any(|post| post.id == params.post_id) {
            return Err(RepoError::InvalidInput {
                message: "post does not exist".to_string(),
            });
        }
        let id = tables.next_id();
        let comment = CommentRecord {
            id,
            content: params.content,
            author_id: params.author_id,
            post_id: params.post_id,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
            is_active: true,
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, id: i64, content: &str) -> Result<CommentRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let comment = tables
            .comments
            .iter_mut()
            .find(|comment| comment.id == id && comment.is_active)
            .ok_or(RepoError::NotFound)?;
        comment.content = content.to_string();
        comment.updated_at = Some(OffsetDateTime::now_utc());
        Ok(comment.clone())
    }

    async fn deactivate_comment(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        let comment = tables
            .comments
            .iter_mut()
            .find(|comment| comment.id == id && comment.is_active)
            .ok_or(RepoError::NotFound)?;
        comment.is_active = false;
        comment.updated_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }
}

/// A cache backend that is always down.
pub struct FailingStore;

#[async_trait]
impl CacheStore for FailingStore {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn delete(&self, _keys: &[String]) -> Result<u64, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn scan(&self, _pattern: &str) -> Result<Vec<String>, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }
}

pub struct TestApp {
    pub router: Router,
    pub repos: Arc<InMemoryRepos>,
    pub store: Arc<dyn CacheStore>,
    pub state: ApiState,
}

pub fn auth_settings() -> AuthSettings {
    AuthSettings {
        jwt_secret: TEST_SECRET.to_string(),
        access_token_ttl: Duration::from_secs(30 * 60),
    }
}

impl TestApp {
    pub fn new() -> Self {
        let capacity = NonZeroUsize::new(1024).expect("non-zero capacity");
        Self::with_store(Arc::new(MemoryStore::new(capacity)))
    }

    pub fn with_store(store: Arc<dyn CacheStore>) -> Self {
        let repos = Arc::new(InMemoryRepos::default());
        let state = ApiState::new(
            Repositories::shared(repos.clone()),
            Cache::new(store.clone()),
            CacheTtls::default(),
            &auth_settings(),
        );
        let router = http::build_router(RouterState { api: state.clone() });
        Self {
            router,
            repos,
            store,
            state,
        }
    }

    /// Seed a user and return a bearer token for it.
    pub async fn user(&self, username: &str) -> (UserRecord, String) {
        self.seeded(username, false).await
    }

    pub async fn admin(&self, username: &str) -> (UserRecord, String) {
        self.seeded(username, true).await
    }

    async fn seeded(&self, username: &str, is_admin: bool) -> (UserRecord, String) {
        let user = self.repos.seed_user(username, is_admin, true).await;
        let token = self
            .state
            .auth
            .issue_token(&user.username)
            .expect("token should encode");
        (user, token)
    }

    /// Seed a user whose password really verifies.
    pub async fn user_with_password(&self, username: &str, password: &str) -> UserRecord {
        let hash = hash_password(password).expect("hash");
        self.repos
            .create_user(CreateUserParams {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                full_name: None,
                password_hash: hash,
            })
            .await
            .expect("user should be created")
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        self.dispatch(request).await
    }

    pub async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn cached(&self, key: &str) -> Option<String> {
        self.store.get(key).await.ok().flatten()
    }
}
