//! User profile handlers

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use scrivo_api_types::UserUpdateRequest;

use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiPath, AuthUser, ValidatedJson};
use crate::infra::http::api::state::ApiState;

pub async fn get_me(
    State(state): State<ApiState>,
    AuthUser(principal): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.users.me(&principal).await?;
    Ok(Json(user))
}

pub async fn update_me(
    State(state): State<ApiState>,
    AuthUser(principal): AuthUser,
    ValidatedJson(payload): ValidatedJson<UserUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.users.update_me(&principal, payload).await?;
    Ok(Json(user))
}

pub async fn get_user(
    State(state): State<ApiState>,
    AuthUser(_principal): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.users.get(id).await?;
    Ok(Json(user))
}
