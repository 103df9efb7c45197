//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::OffsetWindow;
use crate::domain::entities::{CommentRecord, PostRecord, PostTagRecord, TagRecord, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub password_hash: String,
}

/// Profile changes; `None` leaves the stored column untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserParams {
    pub id: i64,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password_hash: Option<String>,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<UserRecord>, RepoError>;
}

#[async_trait]
pub trait UsersWriteRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn update_user(&self, params: UpdateUserParams) -> Result<UserRecord, RepoError>;

    async fn set_admin(&self, username: &str, is_admin: bool) -> Result<UserRecord, RepoError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostListScope {
    /// Published posts from every author.
    Published,
    /// Every post of one author, drafts included.
    Author(i64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQueryFilter {
    pub tag_id: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub is_published: bool,
    pub published_at: Option<OffsetDateTime>,
    pub author_id: i64,
    pub tag_ids: Vec<i64>,
}

/// Partial post update. `None` keeps the stored column; `tag_ids` replaces
/// the association when present. Implementations resolve `published_at`
/// against the row as stored at write time, stamping `now` only on the
/// first publication.
#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: i64,
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub is_published: Option<bool>,
    pub now: OffsetDateTime,
    pub tag_ids: Option<Vec<i64>>,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn list_posts(
        &self,
        scope: PostListScope,
        filter: &PostQueryFilter,
        window: OffsetWindow,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    async fn delete_post(&self, id: i64) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateTagParams {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateTagParams {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    async fn list_all(&self) -> Result<Vec<TagRecord>, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<TagRecord>, RepoError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<TagRecord>, RepoError>;

    async fn list_for_posts(&self, post_ids: &[i64]) -> Result<Vec<PostTagRecord>, RepoError>;
}

#[async_trait]
pub trait TagsWriteRepo: Send + Sync {
    async fn create_tag(&self, params: CreateTagParams) -> Result<TagRecord, RepoError>;

    async fn update_tag(&self, params: UpdateTagParams) -> Result<TagRecord, RepoError>;

    async fn delete_tag(&self, id: i64) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub content: String,
    pub author_id: i64,
    pub post_id: i64,
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Active comments of a post, newest first.
    async fn list_active_for_post(
        &self,
        post_id: i64,
        window: OffsetWindow,
    ) -> Result<Vec<CommentRecord>, RepoError>;

    /// Direct lookup; returns inactive comments too.
    async fn find_by_id(&self, id: i64) -> Result<Option<CommentRecord>, RepoError>;
}

#[async_trait]
pub trait CommentsWriteRepo: Send + Sync {
    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;

    async fn update_comment(&self, id: i64, content: &str) -> Result<CommentRecord, RepoError>;

    async fn deactivate_comment(&self, id: i64) -> Result<(), RepoError>;
}
