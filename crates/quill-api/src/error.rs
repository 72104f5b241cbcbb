use std::fmt;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Which signup field collided with an existing account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateField {
    Email,
    Username,
}

impl fmt::Display for DuplicateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateField::Email => write!(f, "email already registered"),
            DuplicateField::Username => write!(f, "username already taken"),
        }
    }
}

/// Why a caller could not be authenticated. Messages deliberately do not
/// distinguish unknown accounts from wrong passwords, or bad tokens from
/// deleted subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Login with an unknown email or a wrong password.
    IncorrectCredentials,
    /// Bearer token rejected, or its subject no longer exists.
    InvalidSession,
    /// No bearer token on a protected route.
    MissingToken,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailure::IncorrectCredentials => write!(f, "incorrect credentials"),
            AuthFailure::InvalidSession => write!(f, "could not validate credentials"),
            AuthFailure::MissingToken => write!(f, "not authenticated"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Duplicate(DuplicateField),

    #[error("{0}")]
    Authentication(AuthFailure),

    #[error("you are not the author of this post")]
    Forbidden,

    #[error("post not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Duplicate(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, Json(serde_json::json!({ "detail": detail }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_messages_name_the_field() {
        assert_eq!(
            ApiError::Duplicate(DuplicateField::Email).to_string(),
            "email already registered"
        );
        assert_eq!(
            ApiError::Duplicate(DuplicateField::Username).to_string(),
            "username already taken"
        );
    }

    #[test]
    fn unauthorized_responses_carry_bearer_challenge() {
        let response = ApiError::Authentication(AuthFailure::InvalidSession).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

        let response = ApiError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn internal_errors_map_to_500() {
        let err = ApiError::from(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
