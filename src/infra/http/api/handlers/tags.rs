//! Tags handlers

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use scrivo_api_types::{TagCreateRequest, TagUpdateRequest};

use crate::application::pagination::PageQuery;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiPath, ApiQuery, AuthUser, ValidatedJson};
use crate::infra::http::api::state::ApiState;

pub async fn list_tags(
    State(state): State<ApiState>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let tags = state.tags.list(page).await?;
    Ok(Json(tags))
}

pub async fn get_tag(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state.tags.get(id).await?;
    Ok(Json(tag))
}

pub async fn create_tag(
    State(state): State<ApiState>,
    AuthUser(principal): AuthUser,
    ValidatedJson(payload): ValidatedJson<TagCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state.tags.create(&principal, payload).await?;
    Ok(Json(tag))
}

pub async fn update_tag(
    State(state): State<ApiState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(payload): ValidatedJson<TagUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state.tags.update(&principal, id, payload).await?;
    Ok(Json(tag))
}

pub async fn delete_tag(
    State(state): State<ApiState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.tags.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
