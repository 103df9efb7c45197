pub mod auth;
pub mod comments;
pub mod error;
pub mod pagination;
pub mod posts;
pub mod repos;
pub mod tags;
pub mod users;
