//! Comments handlers

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use scrivo_api_types::{CommentCreateRequest, CommentUpdateRequest};

use crate::application::pagination::PageQuery;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiPath, ApiQuery, AuthUser, ValidatedJson};
use crate::infra::http::api::state::ApiState;

pub async fn list_post_comments(
    State(state): State<ApiState>,
    ApiPath(post_id): ApiPath<i64>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = state.comments.list_for_post(post_id, page).await?;
    Ok(Json(comments))
}

pub async fn get_comment(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state.comments.get(id).await?;
    Ok(Json(comment))
}

pub async fn create_comment(
    State(state): State<ApiState>,
    AuthUser(principal): AuthUser,
    ValidatedJson(payload): ValidatedJson<CommentCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state.comments.create(&principal, payload).await?;
    Ok(Json(comment))
}

pub async fn update_comment(
    State(state): State<ApiState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(payload): ValidatedJson<CommentUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state.comments.update(&principal, id, payload).await?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<ApiState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.comments.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
