pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router, state::Repositories};
pub use middleware::RequestContext;

use axum::extract::FromRef;
use axum::{Router, middleware as axum_middleware, routing::get};

#[derive(Clone)]
pub struct RouterState {
    pub api: ApiState,
}

impl FromRef<RouterState> for ApiState {
    fn from_ref(state: &RouterState) -> Self {
        state.api.clone()
    }
}

/// The complete HTTP surface: service routes plus the `/api` tree, wrapped
/// in request-id and response-logging middleware.
pub fn build_router(state: RouterState) -> Router {
    let service_routes = Router::new()
        .route("/", get(api::handlers::welcome))
        .route("/health", get(api::handlers::health));

    service_routes
        .merge(build_api_router(state.clone()))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
