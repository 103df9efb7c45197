use axum::Json;
use axum::response::IntoResponse;
use serde_json::json;

pub async fn welcome() -> impl IntoResponse {
    Json(json!({ "message": "Welcome to the Scrivo blog API" }))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}
