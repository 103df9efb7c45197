use std::sync::Arc;
use std::time::Duration;

use scrivo_api_types::{TagCreateRequest, TagUpdateRequest};
use thiserror::Error;
use tracing::info;

use crate::application::auth::{AuthError, Principal};
use crate::application::pagination::{PageQuery, PaginationError, TAG_LIST_BOUNDS};
use crate::application::repos::{
    CreateTagParams, RepoError, TagsRepo, TagsWriteRepo, UpdateTagParams,
};
use crate::cache::{Cache, Invalidator, Mutation, keys};
use crate::domain::entities::TagRecord;

const NAME_CONSTRAINT: &str = "tags_name_key";

#[derive(Debug, Error)]
pub enum TagError {
    #[error("Tag not found")]
    NotFound,
    #[error("Tag name already exists")]
    DuplicateName,
    #[error("Not enough permissions")]
    Forbidden,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for TagError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { constraint } if constraint == NAME_CONSTRAINT => {
                Self::DuplicateName
            }
            RepoError::NotFound => Self::NotFound,
            other => Self::Repo(other),
        }
    }
}

impl From<AuthError> for TagError {
    fn from(_: AuthError) -> Self {
        Self::Forbidden
    }
}

#[derive(Clone)]
pub struct TagService {
    reader: Arc<dyn TagsRepo>,
    writer: Arc<dyn TagsWriteRepo>,
    cache: Cache,
    invalidator: Invalidator,
    ttl: Duration,
}

impl TagService {
    pub fn new(
        reader: Arc<dyn TagsRepo>,
        writer: Arc<dyn TagsWriteRepo>,
        cache: Cache,
        ttl: Duration,
    ) -> Self {
        let invalidator = Invalidator::new(cache.clone());
        Self {
            reader,
            writer,
            cache,
            invalidator,
            ttl,
        }
    }

    /// The whole tag list is cached under one key; the requested window is
    /// cut from it afterwards.
    pub async fn list(&self, page: PageQuery) -> Result<Vec<TagRecord>, TagError> {
        let window = TAG_LIST_BOUNDS.window(page)?;

        let tags = match self.cache.get_as::<Vec<TagRecord>>(keys::tag_list()).await {
            Some(tags) => tags,
            None => {
                let tags = self.reader.list_all().await?;
                self.cache.set(keys::tag_list(), &tags, self.ttl).await;
                tags
            }
        };

        Ok(window.apply(&tags))
    }

    pub async fn get(&self, id: i64) -> Result<TagRecord, TagError> {
        self.reader.find_by_id(id).await?.ok_or(TagError::NotFound)
    }

    pub async fn create(
        &self,
        principal: &Principal,
        request: TagCreateRequest,
    ) -> Result<TagRecord, TagError> {
        principal.require_admin()?;

        if self.reader.find_by_name(&request.name).await?.is_some() {
            return Err(TagError::DuplicateName);
        }

        let tag = self
            .writer
            .create_tag(CreateTagParams {
                name: request.name,
                description: request.description,
            })
            .await?;

        self.invalidator.apply(Mutation::TagCreated).await;
        info!(target = "scrivo::tags", tag_id = tag.id, name = %tag.name, "tag created");
        Ok(tag)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: i64,
        request: TagUpdateRequest,
    ) -> Result<TagRecord, TagError> {
        principal.require_admin()?;
        let current = self.get(id).await?;

        if let Some(name) = request.name.as_deref()
            && name != current.name
            && self.reader.find_by_name(name).await?.is_some()
        {
            return Err(TagError::DuplicateName);
        }

        let tag = self
            .writer
            .update_tag(UpdateTagParams {
                id,
                name: request.name.unwrap_or(current.name),
                description: request.description.or(current.description),
            })
            .await?;

        self.invalidator.apply(Mutation::TagUpdated).await;
        Ok(tag)
    }

    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<(), TagError> {
        principal.require_admin()?;
        self.get(id).await?;
        self.writer.delete_tag(id).await?;
        self.invalidator.apply(Mutation::TagDeleted).await;
        info!(target = "scrivo::tags", tag_id = id, "tag deleted");
        Ok(())
    }
}
