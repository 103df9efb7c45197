//! Write-side cache invalidation.
//!
//! Each committed mutation maps to a fixed purge plan. Plans may purge more
//! than the strictly affected keys but never less.

use std::fmt;

use tracing::info;

use super::keys;
use super::layer::Cache;

/// A committed write that can leave cached projections stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    PostCreated { published: bool },
    PostUpdated { post_id: i64 },
    PostDeleted { post_id: i64 },
    CommentCreated { post_id: i64 },
    CommentUpdated { post_id: i64 },
    CommentDeleted { post_id: i64 },
    TagCreated,
    TagUpdated,
    TagDeleted,
    /// Profile edits change the author view embedded in posts and comments.
    UserUpdated,
}

impl Mutation {
    fn as_str(&self) -> &'static str {
        match self {
            Self::PostCreated { .. } => "post_created",
            Self::PostUpdated { .. } => "post_updated",
            Self::PostDeleted { .. } => "post_deleted",
            Self::CommentCreated { .. } => "comment_created",
            Self::CommentUpdated { .. } => "comment_updated",
            Self::CommentDeleted { .. } => "comment_deleted",
            Self::TagCreated => "tag_created",
            Self::TagUpdated => "tag_updated",
            Self::TagDeleted => "tag_deleted",
            Self::UserUpdated => "user_updated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Purge {
    Key(String),
    Pattern(String),
}

impl fmt::Display for Purge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "key {key}"),
            Self::Pattern(pattern) => write!(f, "pattern {pattern}"),
        }
    }
}

/// The purge actions owed after `mutation` commits.
pub fn purge_plan(mutation: Mutation) -> Vec<Purge> {
    let post_lists = || Purge::Pattern(keys::post_list_pattern());
    let tag_list = || Purge::Key(keys::tag_list().to_string());

    match mutation {
        Mutation::PostCreated { published: true } => vec![post_lists()],
        Mutation::PostCreated { published: false } => Vec::new(),
        Mutation::PostUpdated { post_id } => {
            vec![Purge::Key(keys::post_detail(post_id)), post_lists()]
        }
        // Deleting a post also drops its comments.
        Mutation::PostDeleted { post_id } => vec![
            Purge::Key(keys::post_detail(post_id)),
            post_lists(),
            Purge::Pattern(keys::comment_list_pattern(post_id)),
        ],
        Mutation::CommentCreated { post_id }
        | Mutation::CommentUpdated { post_id }
        | Mutation::CommentDeleted { post_id } => {
            vec![Purge::Pattern(keys::comment_list_pattern(post_id))]
        }
        Mutation::TagCreated => vec![tag_list()],
        // Posts embed their tags.
        Mutation::TagUpdated | Mutation::TagDeleted => vec![
            tag_list(),
            post_lists(),
            Purge::Pattern(keys::post_detail_pattern()),
        ],
        Mutation::UserUpdated => vec![
            post_lists(),
            Purge::Pattern(keys::post_detail_pattern()),
            Purge::Pattern(keys::all_comment_lists_pattern()),
        ],
    }
}

/// Applies purge plans to the shared cache.
#[derive(Clone)]
pub struct Invalidator {
    cache: Cache,
}

impl Invalidator {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Run the purge plan for `mutation`. Call only after the write has
    /// committed; failures are absorbed by the cache layer.
    pub async fn apply(&self, mutation: Mutation) {
        let plan = purge_plan(mutation);
        if plan.is_empty() {
            return;
        }

        let mut removed = 0u64;
        for purge in &plan {
            removed += match purge {
                Purge::Key(key) => u64::from(self.cache.delete(key).await),
                Purge::Pattern(pattern) => self.cache.delete_by_pattern(pattern).await,
            };
        }

        info!(
            target = "scrivo::cache::invalidation",
            mutation = mutation.as_str(),
            actions = plan.len(),
            removed,
            "cache invalidated"
        );
    }
}
