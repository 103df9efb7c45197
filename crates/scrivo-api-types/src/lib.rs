//! Wire payloads accepted and returned by the Scrivo blog API.
//!
//! Request types carry their field rules as `validator` attributes so the
//! HTTP layer can reject malformed input before any state is touched.

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
    #[validate(length(min = 6))]
    pub password: String,
}

/// Credentials for `POST /api/auth/login`, accepted as JSON or form fields.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct UserUpdateRequest {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
    #[validate(length(min = 6))]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct PostCreateRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub content: String,
    #[validate(length(max = 500))]
    pub summary: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

/// Partial post update. Absent fields keep their stored value; `tag_ids`
/// replaces the association only when present.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct PostUpdateRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub content: Option<String>,
    #[validate(length(max = 500))]
    pub summary: Option<String>,
    pub is_published: Option<bool>,
    pub tag_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct TagCreateRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct TagUpdateRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CommentCreateRequest {
    #[validate(length(min = 1))]
    pub content: String,
    pub post_id: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CommentUpdateRequest {
    #[validate(length(min = 1))]
    pub content: String,
}
