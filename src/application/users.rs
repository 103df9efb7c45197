use std::sync::Arc;

use scrivo_api_types::{RegisterRequest, UserUpdateRequest};
use thiserror::Error;
use tracing::info;

use crate::application::auth::{AuthError, Principal, hash_password};
use crate::application::repos::{
    CreateUserParams, RepoError, UpdateUserParams, UsersRepo, UsersWriteRepo,
};
use crate::cache::{Invalidator, Mutation};
use crate::domain::entities::UserView;

const USERNAME_CONSTRAINT: &str = "users_username_key";
const EMAIL_CONSTRAINT: &str = "users_email_key";

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Username already registered")]
    DuplicateUsername,
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("User not found")]
    NotFound,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for UserError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { constraint } if constraint == USERNAME_CONSTRAINT => {
                Self::DuplicateUsername
            }
            RepoError::Duplicate { constraint } if constraint == EMAIL_CONSTRAINT => {
                Self::DuplicateEmail
            }
            RepoError::NotFound => Self::NotFound,
            other => Self::Repo(other),
        }
    }
}

#[derive(Clone)]
pub struct UserService {
    reader: Arc<dyn UsersRepo>,
    writer: Arc<dyn UsersWriteRepo>,
    invalidator: Invalidator,
}

impl UserService {
    pub fn new(
        reader: Arc<dyn UsersRepo>,
        writer: Arc<dyn UsersWriteRepo>,
        invalidator: Invalidator,
    ) -> Self {
        Self {
            reader,
            writer,
            invalidator,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<UserView, UserError> {
        if self
            .reader
            .find_by_username(&request.username)
            .await?
            .is_some()
        {
            return Err(UserError::DuplicateUsername);
        }
        if self.reader.find_by_email(&request.email).await?.is_some() {
            return Err(UserError::DuplicateEmail);
        }

        let password_hash = hash_password(&request.password)?;
        let user = self
            .writer
            .create_user(CreateUserParams {
                username: request.username,
                email: request.email,
                full_name: request.full_name,
                password_hash,
            })
            .await?;

        info!(
            target = "scrivo::users",
            user_id = user.id,
            username = %user.username,
            "user registered"
        );
        Ok(UserView::from(&user))
    }

    pub async fn get(&self, id: i64) -> Result<UserView, UserError> {
        self.reader
            .find_by_id(id)
            .await?
            .map(|user| UserView::from(&user))
            .ok_or(UserError::NotFound)
    }

    pub async fn me(&self, principal: &Principal) -> Result<UserView, UserError> {
        self.get(principal.id).await
    }

    /// Apply a self-service profile edit. Cached posts and comments embed
    /// the author view, so they are purged once the change is stored.
    pub async fn update_me(
        &self,
        principal: &Principal,
        request: UserUpdateRequest,
    ) -> Result<UserView, UserError> {
        if let Some(email) = request.email.as_deref()
            && let Some(owner) = self.reader.find_by_email(email).await?
            && owner.id != principal.id
        {
            return Err(UserError::DuplicateEmail);
        }

        let password_hash = request
            .password
            .as_deref()
            .map(hash_password)
            .transpose()?;

        let user = self
            .writer
            .update_user(UpdateUserParams {
                id: principal.id,
                email: request.email,
                full_name: request.full_name,
                password_hash,
            })
            .await?;

        self.invalidator.apply(Mutation::UserUpdated).await;
        Ok(UserView::from(&user))
    }

    pub async fn grant_admin(&self, username: &str) -> Result<UserView, UserError> {
        let user = self.writer.set_admin(username, true).await?;
        self.invalidator.apply(Mutation::UserUpdated).await;
        info!(
            target = "scrivo::users",
            user_id = user.id,
            username = %user.username,
            "admin role granted"
        );
        Ok(UserView::from(&user))
    }
}
