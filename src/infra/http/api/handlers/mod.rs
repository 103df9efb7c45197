//! API handlers organized by resource type.
//!
//! Handlers stay thin: extract, call the service with the resolved
//! principal, map the service error into [`ApiError`](super::error::ApiError).

mod auth;
mod comments;
mod posts;
mod service;
mod tags;
mod users;

pub use auth::*;
pub use comments::*;
pub use posts::*;
pub use service::*;
pub use tags::*;
pub use users::*;
