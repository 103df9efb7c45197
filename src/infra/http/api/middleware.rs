use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use crate::application::auth::{AuthError, Principal};

use super::error::{ApiError, codes};
use super::state::ApiState;

/// Outcome of bearer token resolution, stored in the request extensions for
/// the extractors in [`super::extract`].
#[derive(Debug, Clone)]
pub enum Authentication {
    Anonymous,
    Authenticated(Principal),
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    InvalidToken,
    InactiveUser,
    Unavailable,
}

impl Authentication {
    /// The caller must be an active, known user.
    pub fn require(&self) -> Result<Principal, ApiError> {
        match self {
            Self::Authenticated(principal) => Ok(principal.clone()),
            Self::Anonymous => Err(ApiError::not_authenticated()),
            Self::Rejected(Rejection::InvalidToken) => Err(ApiError::from(AuthError::InvalidToken)),
            Self::Rejected(Rejection::InactiveUser) => Err(ApiError::inactive_user()),
            Self::Rejected(Rejection::Unavailable) => Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::INTERNAL,
                "Internal server error",
                None,
            )),
        }
    }

    /// Any failure to authenticate counts as an anonymous caller.
    pub fn optional(&self) -> Option<Principal> {
        match self {
            Self::Authenticated(principal) => Some(principal.clone()),
            _ => None,
        }
    }
}

/// Resolve the bearer token, if any. Never rejects the request itself: each
/// handler decides whether it needs a principal.
pub async fn resolve_principal(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let authentication = match extract_token(request.headers().get(header::AUTHORIZATION)) {
        None => Authentication::Anonymous,
        Some(token) => match state.auth.resolve(&token).await {
            Ok(principal) => Authentication::Authenticated(principal),
            Err(AuthError::InactiveUser) => Authentication::Rejected(Rejection::InactiveUser),
            Err(AuthError::Repo(err)) => {
                warn!(
                    target = "scrivo::http::auth",
                    error = %err,
                    "principal lookup failed"
                );
                Authentication::Rejected(Rejection::Unavailable)
            }
            Err(_) => Authentication::Rejected(Rejection::InvalidToken),
        },
    };

    let principal = authentication.optional();
    request.extensions_mut().insert(authentication);

    let mut response = next.run(request).await;
    if let Some(principal) = principal {
        response.extensions_mut().insert(principal);
    }
    response
}

fn extract_token(header: Option<&HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?.trim();
    (!bearer.is_empty()).then(|| bearer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bearer_tokens_only() {
        let bearer = HeaderValue::from_static("Bearer abc.def");
        let basic = HeaderValue::from_static("Basic Zm9vOmJhcg==");
        let empty = HeaderValue::from_static("Bearer ");
        assert_eq!(extract_token(Some(&bearer)).as_deref(), Some("abc.def"));
        assert_eq!(extract_token(Some(&basic)), None);
        assert_eq!(extract_token(Some(&empty)), None);
        assert_eq!(extract_token(None), None);
    }

    #[test]
    fn rejected_tokens_are_anonymous_for_optional_routes() {
        let rejected = Authentication::Rejected(Rejection::InvalidToken);
        assert!(rejected.optional().is_none());
        assert_eq!(
            rejected.require().expect_err("must fail").status(),
            StatusCode::UNAUTHORIZED
        );
        let inactive = Authentication::Rejected(Rejection::InactiveUser);
        assert_eq!(
            inactive.require().expect_err("must fail").status(),
            StatusCode::BAD_REQUEST
        );
    }
}
