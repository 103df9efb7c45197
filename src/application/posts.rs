use std::collections::HashMap;
use std::sync::Arc;

use scrivo_api_types::{PostCreateRequest, PostUpdateRequest};
use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::application::auth::Principal;
use crate::application::pagination::{
    OffsetWindow, POST_LIST_BOUNDS, PageQuery, PaginationError,
};
use crate::application::repos::{
    CreatePostParams, PostListScope, PostQueryFilter, PostsRepo, PostsWriteRepo, RepoError,
    TagsRepo, UpdatePostParams, UsersRepo,
};
use crate::cache::{Cache, CacheTtls, Invalidator, Mutation, keys};
use crate::domain::entities::{PostRecord, PostView, TagRecord, UserView};
use crate::domain::posts::resolve_published_at;

#[derive(Debug, Error)]
pub enum PostError {
    #[error("Post not found")]
    NotFound,
    #[error("Not enough permissions")]
    Forbidden,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for PostError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound,
            other => Self::Repo(other),
        }
    }
}

/// Query string accepted by the post list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub tag_id: Option<i64>,
    pub search: Option<String>,
}

impl PostListQuery {
    fn window(&self) -> Result<OffsetWindow, PaginationError> {
        POST_LIST_BOUNDS.window(PageQuery {
            skip: self.skip,
            limit: self.limit,
        })
    }

    fn filter(&self) -> PostQueryFilter {
        PostQueryFilter {
            tag_id: self.tag_id,
            search: self
                .search
                .as_deref()
                .filter(|term| !term.is_empty())
                .map(str::to_string),
        }
    }
}

#[derive(Clone)]
pub struct PostService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    tags: Arc<dyn TagsRepo>,
    users: Arc<dyn UsersRepo>,
    cache: Cache,
    invalidator: Invalidator,
    ttls: CacheTtls,
}

impl PostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        tags: Arc<dyn TagsRepo>,
        users: Arc<dyn UsersRepo>,
        cache: Cache,
        ttls: CacheTtls,
    ) -> Self {
        let invalidator = Invalidator::new(cache.clone());
        Self {
            reader,
            writer,
            tags,
            users,
            cache,
            invalidator,
            ttls,
        }
    }

    /// Public list of published posts, newest first.
    pub async fn list_published(&self, query: &PostListQuery) -> Result<Vec<PostView>, PostError> {
        let window = query.window()?;
        let filter = query.filter();
        let key = keys::post_list(
            window.skip,
            window.limit,
            filter.tag_id,
            filter.search.as_deref(),
        );

        if let Some(posts) = self.cache.get_as::<Vec<PostView>>(&key).await {
            return Ok(posts);
        }

        let records = self
            .reader
            .list_posts(PostListScope::Published, &filter, window)
            .await?;
        let posts = self.hydrate(records).await?;
        self.cache.set(&key, &posts, self.ttls.post_list).await;
        Ok(posts)
    }

    /// Every post of the caller, drafts included. Never cached.
    pub async fn list_for_author(
        &self,
        principal: &Principal,
        query: &PostListQuery,
    ) -> Result<Vec<PostView>, PostError> {
        let window = query.window()?;
        let records = self
            .reader
            .list_posts(PostListScope::Author(principal.id), &query.filter(), window)
            .await?;
        self.hydrate(records).await
    }

    /// Single post. Drafts are only shown to their author, whether the view
    /// comes from the cache or from storage.
    pub async fn get(&self, id: i64, viewer: Option<&Principal>) -> Result<PostView, PostError> {
        let key = keys::post_detail(id);
        if let Some(post) = self.cache.get_as::<PostView>(&key).await {
            ensure_visible(&post.post, viewer)?;
            return Ok(post);
        }

        let record = self.reader.find_by_id(id).await?.ok_or(PostError::NotFound)?;
        ensure_visible(&record, viewer)?;

        let post = self.hydrate_one(record).await?;
        self.cache.set(&key, &post, self.ttls.post_detail).await;
        Ok(post)
    }

    pub async fn create(
        &self,
        principal: &Principal,
        request: PostCreateRequest,
    ) -> Result<PostView, PostError> {
        let now = OffsetDateTime::now_utc();
        let record = self
            .writer
            .create_post(CreatePostParams {
                title: request.title,
                content: request.content,
                summary: request.summary,
                is_published: request.is_published,
                published_at: resolve_published_at(None, request.is_published, now),
                author_id: principal.id,
                tag_ids: request.tag_ids,
            })
            .await?;

        self.invalidator
            .apply(Mutation::PostCreated {
                published: record.is_published,
            })
            .await;

        info!(
            target = "scrivo::posts",
            post_id = record.id,
            author_id = principal.id,
            published = record.is_published,
            "post created"
        );
        self.hydrate_one(record).await
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: i64,
        request: PostUpdateRequest,
    ) -> Result<PostView, PostError> {
        self.owned_post(principal, id).await?;

        let record = self
            .writer
            .update_post(UpdatePostParams {
                id,
                title: request.title,
                content: request.content,
                summary: request.summary,
                is_published: request.is_published,
                now: OffsetDateTime::now_utc(),
                tag_ids: request.tag_ids,
            })
            .await?;

        self.invalidator
            .apply(Mutation::PostUpdated { post_id: id })
            .await;
        self.hydrate_one(record).await
    }

    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<(), PostError> {
        self.owned_post(principal, id).await?;
        self.writer.delete_post(id).await?;
        self.invalidator
            .apply(Mutation::PostDeleted { post_id: id })
            .await;

        info!(
            target = "scrivo::posts",
            post_id = id,
            author_id = principal.id,
            "post deleted"
        );
        Ok(())
    }

    async fn owned_post(&self, principal: &Principal, id: i64) -> Result<PostRecord, PostError> {
        let post = self.reader.find_by_id(id).await?.ok_or(PostError::NotFound)?;
        if !principal.owns(post.author_id) {
            return Err(PostError::Forbidden);
        }
        Ok(post)
    }

    async fn hydrate_one(&self, record: PostRecord) -> Result<PostView, PostError> {
        self.hydrate(vec![record])
            .await?
            .pop()
            .ok_or(PostError::NotFound)
    }

    /// Attach author views and tags to a batch of posts, preserving order.
    async fn hydrate(&self, records: Vec<PostRecord>) -> Result<Vec<PostView>, PostError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut author_ids: Vec<i64> = records.iter().map(|post| post.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors: HashMap<i64, UserView> = self
            .users
            .list_by_ids(&author_ids)
            .await?
            .iter()
            .map(|user| (user.id, UserView::from(user)))
            .collect();

        let post_ids: Vec<i64> = records.iter().map(|post| post.id).collect();
        let mut tags: HashMap<i64, Vec<TagRecord>> = HashMap::new();
        for link in self.tags.list_for_posts(&post_ids).await? {
            tags.entry(link.post_id).or_default().push(link.tag);
        }

        records
            .into_iter()
            .map(|post| {
                let author = authors.get(&post.author_id).cloned().ok_or_else(|| {
                    PostError::Repo(RepoError::Integrity {
                        message: format!("post {} references missing author", post.id),
                    })
                })?;
                let tags = tags.remove(&post.id).unwrap_or_default();
                Ok(PostView { post, author, tags })
            })
            .collect()
    }
}

fn ensure_visible(post: &PostRecord, viewer: Option<&Principal>) -> Result<(), PostError> {
    if post.is_published || viewer.is_some_and(|principal| principal.owns(post.author_id)) {
        Ok(())
    } else {
        Err(PostError::Forbidden)
    }
}
