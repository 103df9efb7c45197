use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use scrivo_api_types::{CommentCreateRequest, CommentUpdateRequest};
use thiserror::Error;
use tracing::info;

use crate::application::auth::Principal;
use crate::application::pagination::{COMMENT_LIST_BOUNDS, PageQuery, PaginationError};
use crate::application::repos::{
    CommentsRepo, CommentsWriteRepo, CreateCommentParams, PostsRepo, RepoError, UsersRepo,
};
use crate::cache::{Cache, Invalidator, Mutation, keys};
use crate::domain::entities::{CommentRecord, CommentView, UserView};

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("Comment not found")]
    NotFound,
    #[error("Post not found")]
    PostNotFound,
    #[error("Not enough permissions")]
    Forbidden,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for CommentError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound,
            other => Self::Repo(other),
        }
    }
}

#[derive(Clone)]
pub struct CommentService {
    reader: Arc<dyn CommentsRepo>,
    writer: Arc<dyn CommentsWriteRepo>,
    posts: Arc<dyn PostsRepo>,
    users: Arc<dyn UsersRepo>,
    cache: Cache,
    invalidator: Invalidator,
    ttl: Duration,
}

impl CommentService {
    pub fn new(
        reader: Arc<dyn CommentsRepo>,
        writer: Arc<dyn CommentsWriteRepo>,
        posts: Arc<dyn PostsRepo>,
        users: Arc<dyn UsersRepo>,
        cache: Cache,
        ttl: Duration,
    ) -> Self {
        let invalidator = Invalidator::new(cache.clone());
        Self {
            reader,
            writer,
            posts,
            users,
            cache,
            invalidator,
            ttl,
        }
    }

    /// Active comments of a post, newest first.
    pub async fn list_for_post(
        &self,
        post_id: i64,
        page: PageQuery,
    ) -> Result<Vec<CommentView>, CommentError> {
        let window = COMMENT_LIST_BOUNDS.window(page)?;
        self.ensure_post(post_id).await?;

        let key = keys::comment_list(post_id, window.skip, window.limit);
        if let Some(comments) = self.cache.get_as::<Vec<CommentView>>(&key).await {
            return Ok(comments);
        }

        let records = self.reader.list_active_for_post(post_id, window).await?;
        let comments = self.hydrate(records).await?;
        self.cache.set(&key, &comments, self.ttl).await;
        Ok(comments)
    }

    /// Direct lookup. Soft-deleted comments are still returned here.
    pub async fn get(&self, id: i64) -> Result<CommentView, CommentError> {
        let record = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(CommentError::NotFound)?;
        self.hydrate_one(record).await
    }

    pub async fn create(
        &self,
        principal: &Principal,
        request: CommentCreateRequest,
    ) -> Result<CommentView, CommentError> {
        self.ensure_post(request.post_id).await?;

        let record = self
            .writer
            .create_comment(CreateCommentParams {
                content: request.content,
                author_id: principal.id,
                post_id: request.post_id,
            })
            .await?;

        self.invalidator
            .apply(Mutation::CommentCreated {
                post_id: record.post_id,
            })
            .await;
        self.hydrate_one(record).await
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: i64,
        request: CommentUpdateRequest,
    ) -> Result<CommentView, CommentError> {
        self.owned_comment(principal, id).await?;
        let record = self.writer.update_comment(id, &request.content).await?;

        self.invalidator
            .apply(Mutation::CommentUpdated {
                post_id: record.post_id,
            })
            .await;
        self.hydrate_one(record).await
    }

    /// Soft delete: the comment is flagged inactive and drops out of lists.
    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<(), CommentError> {
        let comment = self.owned_comment(principal, id).await?;
        self.writer.deactivate_comment(id).await?;

        self.invalidator
            .apply(Mutation::CommentDeleted {
                post_id: comment.post_id,
            })
            .await;
        info!(
            target = "scrivo::comments",
            comment_id = id,
            post_id = comment.post_id,
            "comment deactivated"
        );
        Ok(())
    }

    async fn ensure_post(&self, post_id: i64) -> Result<(), CommentError> {
        match self.posts.find_by_id(post_id).await? {
            Some(_) => Ok(()),
            None => Err(CommentError::PostNotFound),
        }
    }

    /// Only active comments can be edited; an inactive one reads as absent.
    async fn owned_comment(
        &self,
        principal: &Principal,
        id: i64,
    ) -> Result<CommentRecord, CommentError> {
        let comment = self
            .reader
            .find_by_id(id)
            .await?
            .filter(|comment| comment.state().is_visible())
            .ok_or(CommentError::NotFound)?;
        if !principal.owns(comment.author_id) {
            return Err(CommentError::Forbidden);
        }
        Ok(comment)
    }

    async fn hydrate_one(&self, record: CommentRecord) -> Result<CommentView, CommentError> {
        self.hydrate(vec![record])
            .await?
            .pop()
            .ok_or(CommentError::NotFound)
    }

    async fn hydrate(&self, records: Vec<CommentRecord>) -> Result<Vec<CommentView>, CommentError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut author_ids: Vec<i64> = records.iter().map(|comment| comment.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors: HashMap<i64, UserView> = self
            .users
            .list_by_ids(&author_ids)
            .await?
            .iter()
            .map(|user| (user.id, UserView::from(user)))
            .collect();

        records
            .into_iter()
            .map(|comment| {
                let author = authors.get(&comment.author_id).cloned().ok_or_else(|| {
                    CommentError::Repo(RepoError::Integrity {
                        message: format!("comment {} references missing author", comment.id),
                    })
                })?;
                Ok(CommentView { comment, author })
            })
            .collect()
    }
}
