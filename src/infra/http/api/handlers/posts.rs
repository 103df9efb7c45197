//! Posts handlers

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use scrivo_api_types::{PostCreateRequest, PostUpdateRequest};

use crate::application::posts::PostListQuery;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiPath, ApiQuery, AuthUser, MaybeAuthUser, ValidatedJson};
use crate::infra::http::api::state::ApiState;

pub async fn list_posts(
    State(state): State<ApiState>,
    ApiQuery(query): ApiQuery<PostListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state.posts.list_published(&query).await?;
    Ok(Json(posts))
}

pub async fn list_my_posts(
    State(state): State<ApiState>,
    AuthUser(principal): AuthUser,
    ApiQuery(query): ApiQuery<PostListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state.posts.list_for_author(&principal, &query).await?;
    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<ApiState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.posts.get(id, viewer.as_ref()).await?;
    Ok(Json(post))
}

pub async fn create_post(
    State(state): State<ApiState>,
    AuthUser(principal): AuthUser,
    ValidatedJson(payload): ValidatedJson<PostCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.posts.create(&principal, payload).await?;
    Ok(Json(post))
}

pub async fn update_post(
    State(state): State<ApiState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(payload): ValidatedJson<PostUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.posts.update(&principal, id, payload).await?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.posts.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
