//! Registration and login handlers

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use scrivo_api_types::{RegisterRequest, TokenResponse};

use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{LoginForm, ValidatedJson};
use crate::infra::http::api::state::ApiState;

pub async fn register(
    State(state): State<ApiState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.users.register(payload).await?;
    Ok(Json(user))
}

pub async fn login(
    State(state): State<ApiState>,
    credentials: LoginForm,
) -> Result<impl IntoResponse, ApiError> {
    let token = state
        .auth
        .login(&credentials.username, &credentials.password)
        .await?;
    Ok(Json(TokenResponse::bearer(token)))
}
