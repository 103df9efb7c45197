use std::error::Error as StdError;

use axum::Json;
use axum::extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use validator::ValidationErrors;

use crate::application::auth::AuthError;
use crate::application::comments::CommentError;
use crate::application::error::ErrorReport;
use crate::application::pagination::PaginationError;
use crate::application::posts::PostError;
use crate::application::repos::RepoError;
use crate::application::tags::TagError;
use crate::application::users::UserError;

const SOURCE: &str = "infra::http::api";

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const VALIDATION: &str = "validation_failed";
    pub const INVALID_PAGINATION: &str = "invalid_pagination";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const INACTIVE_USER: &str = "inactive_user";
    pub const FORBIDDEN: &str = "forbidden";
    pub const NOT_FOUND: &str = "not_found";
    pub const DUPLICATE: &str = "duplicate";
    pub const UNSUPPORTED_MEDIA_TYPE: &str = "unsupported_media_type";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTERNAL: &str = "internal_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    /// Diagnostic chain for the response logger. Never sent to clients.
    chain: Vec<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            chain: Vec::new(),
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn unauthorized(message: &'static str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, codes::UNAUTHORIZED, message, None)
    }

    pub fn not_authenticated() -> Self {
        Self::unauthorized("Not authenticated")
    }

    pub fn inactive_user() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::INACTIVE_USER,
            "Inactive user",
            None,
        )
    }

    pub fn forbidden() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            codes::FORBIDDEN,
            "Not enough permissions",
            None,
        )
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn duplicate(message: &'static str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::DUPLICATE, message, None)
    }

    pub fn unsupported_media_type(hint: Option<String>) -> Self {
        Self::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            codes::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported media type",
            hint,
        )
    }

    /// A failure the client cannot act on. The body stays generic; the
    /// error chain is kept for the response log.
    pub fn internal(error: &dyn StdError) -> Self {
        let report =
            ErrorReport::from_error(SOURCE, StatusCode::INTERNAL_SERVER_ERROR, error);
        Self {
            chain: report.messages,
            ..Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::INTERNAL,
                "Internal server error",
                None,
            )
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = if self.chain.is_empty() {
            ErrorReport::from_message(
                SOURCE,
                self.status,
                format!(
                    "{}: {}",
                    self.code,
                    self.hint.as_deref().unwrap_or(self.message)
                ),
            )
        } else {
            ErrorReport {
                source: SOURCE,
                status: self.status,
                messages: self.chain,
            }
        };

        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        report.attach(&mut response);
        response
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::not_found("Resource not found"),
            RepoError::Duplicate { constraint } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::DUPLICATE,
                "Duplicate record",
                Some(constraint),
            ),
            RepoError::InvalidInput { message } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(message),
            ),
            other => Self::internal(&other),
        }
    }
}

impl From<PaginationError> for ApiError {
    fn from(err: PaginationError) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_PAGINATION,
            "Invalid pagination parameters",
            Some(err.to_string()),
        )
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::VALIDATION,
            "Request validation failed",
            Some(err.to_string()),
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(inner) => {
                Self::unsupported_media_type(Some(inner.body_text()))
            }
            other => Self::bad_request("Malformed JSON body", Some(other.body_text())),
        }
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self::bad_request("Malformed form body", Some(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request("Invalid query string", Some(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request("Invalid path parameter", Some(rejection.body_text()))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken => Self::unauthorized("Could not validate credentials"),
            AuthError::InvalidCredentials => Self::unauthorized("Incorrect username or password"),
            AuthError::InactiveUser => Self::inactive_user(),
            AuthError::Forbidden => Self::forbidden(),
            AuthError::Repo(repo) => Self::from(repo),
            other @ (AuthError::Hashing(_) | AuthError::Encoding(_)) => Self::internal(&other),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::DuplicateUsername => Self::duplicate("Username already registered"),
            UserError::DuplicateEmail => Self::duplicate("Email already registered"),
            UserError::NotFound => Self::not_found("User not found"),
            UserError::Auth(auth) => Self::from(auth),
            UserError::Repo(repo) => Self::from(repo),
        }
    }
}

impl From<PostError> for ApiError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::NotFound => Self::not_found("Post not found"),
            PostError::Forbidden => Self::forbidden(),
            PostError::Pagination(pagination) => Self::from(pagination),
            PostError::Repo(repo) => Self::from(repo),
        }
    }
}

impl From<TagError> for ApiError {
    fn from(err: TagError) -> Self {
        match err {
            TagError::NotFound => Self::not_found("Tag not found"),
            TagError::DuplicateName => Self::duplicate("Tag name already exists"),
            TagError::Forbidden => Self::forbidden(),
            TagError::Pagination(pagination) => Self::from(pagination),
            TagError::Repo(repo) => Self::from(repo),
        }
    }
}

impl From<CommentError> for ApiError {
    fn from(err: CommentError) -> Self {
        match err {
            CommentError::NotFound => Self::not_found("Comment not found"),
            CommentError::PostNotFound => Self::not_found("Post not found"),
            CommentError::Forbidden => Self::forbidden(),
            CommentError::Pagination(pagination) => Self::from(pagination),
            CommentError::Repo(repo) => Self::from(repo),
        }
    }
}
