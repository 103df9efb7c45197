use std::sync::Arc;

use crate::application::auth::AuthService;
use crate::application::comments::CommentService;
use crate::application::posts::PostService;
use crate::application::repos::{
    CommentsRepo, CommentsWriteRepo, PostsRepo, PostsWriteRepo, TagsRepo, TagsWriteRepo,
    UsersRepo, UsersWriteRepo,
};
use crate::application::tags::TagService;
use crate::application::users::UserService;
use crate::cache::{Cache, CacheTtls, Invalidator};
use crate::config::AuthSettings;

/// Every repository the services need, as trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UsersRepo>,
    pub users_write: Arc<dyn UsersWriteRepo>,
    pub posts: Arc<dyn PostsRepo>,
    pub posts_write: Arc<dyn PostsWriteRepo>,
    pub tags: Arc<dyn TagsRepo>,
    pub tags_write: Arc<dyn TagsWriteRepo>,
    pub comments: Arc<dyn CommentsRepo>,
    pub comments_write: Arc<dyn CommentsWriteRepo>,
}

impl Repositories {
    /// Use one adapter for every repository trait.
    pub fn shared<R>(repo: Arc<R>) -> Self
    where
        R: UsersRepo
            + UsersWriteRepo
            + PostsRepo
            + PostsWriteRepo
            + TagsRepo
            + TagsWriteRepo
            + CommentsRepo
            + CommentsWriteRepo
            + 'static,
    {
        Self {
            users: repo.clone(),
            users_write: repo.clone(),
            posts: repo.clone(),
            posts_write: repo.clone(),
            tags: repo.clone(),
            tags_write: repo.clone(),
            comments: repo.clone(),
            comments_write: repo,
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub posts: Arc<PostService>,
    pub tags: Arc<TagService>,
    pub comments: Arc<CommentService>,
}

impl ApiState {
    pub fn new(repos: Repositories, cache: Cache, ttls: CacheTtls, auth: &AuthSettings) -> Self {
        let auth_service = AuthService::new(
            repos.users.clone(),
            &auth.jwt_secret,
            auth.access_token_ttl,
        );
        let users = UserService::new(
            repos.users.clone(),
            repos.users_write,
            Invalidator::new(cache.clone()),
        );
        let posts = PostService::new(
            repos.posts.clone(),
            repos.posts_write,
            repos.tags.clone(),
            repos.users.clone(),
            cache.clone(),
            ttls,
        );
        let tags = TagService::new(repos.tags, repos.tags_write, cache.clone(), ttls.tag_list);
        let comments = CommentService::new(
            repos.comments,
            repos.comments_write,
            repos.posts,
            repos.users,
            cache,
            ttls.comment_list,
        );

        Self {
            auth: Arc::new(auth_service),
            users: Arc::new(users),
            posts: Arc::new(posts),
            tags: Arc::new(tags),
            comments: Arc::new(comments),
        }
    }
}
