//! Request extractors that reject with [`ApiError`] instead of axum's
//! plain-text rejections.

use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header;
use axum::http::request::Parts;
use axum::{Form, Json};
use scrivo_api_types::LoginRequest;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::application::auth::Principal;

use super::error::ApiError;
use super::middleware::Authentication;

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// JSON body that has passed its `validator` rules.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// An active, authenticated caller. Missing or bad credentials reject.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Authentication>() {
            Some(authentication) => authentication.require().map(Self),
            None => Err(ApiError::not_authenticated()),
        }
    }
}

/// The caller if one could be authenticated, otherwise anonymous.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<Principal>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<Authentication>()
                .and_then(Authentication::optional),
        ))
    }
}

/// Login credentials, read as a urlencoded form or as JSON depending on the
/// `Content-Type` header.
#[derive(Debug)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl<S> FromRequest<S> for LoginForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase())
            .unwrap_or_default();

        let payload = if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(payload) = Form::<LoginRequest>::from_request(request, state).await?;
            payload
        } else if content_type.starts_with("application/json") {
            let Json(payload) = Json::<LoginRequest>::from_request(request, state).await?;
            payload
        } else {
            return Err(ApiError::unsupported_media_type(Some(
                "send application/x-www-form-urlencoded or application/json".to_string(),
            )));
        };

        match (payload.username, payload.password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Ok(Self { username, password })
            }
            _ => Err(ApiError::bad_request(
                "Username and password are required",
                None,
            )),
        }
    }
}
