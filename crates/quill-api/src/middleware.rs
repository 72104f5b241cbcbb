use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

use crate::auth::{AppState, run_blocking};
use crate::error::{ApiError, AuthFailure};

/// Resolve the bearer token to a [`quill_types::models::User`] and attach it
/// to the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or(ApiError::Authentication(AuthFailure::MissingToken))?;

    let gateway = state.gateway.clone();
    let user = run_blocking(move || gateway.resolve_current_user(&token)).await?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// The credentials of an `Authorization: Bearer` header. The scheme name is
/// matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_auth(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn scheme_is_case_insensitive() {
        for value in ["Bearer abc", "bearer abc", "BEARER abc", "Bearer   abc  "] {
            assert_eq!(bearer_token(&with_auth(value)).as_deref(), Some("abc"), "{value:?}");
        }
    }

    #[test]
    fn other_schemes_and_empty_tokens_are_rejected() {
        for value in ["Basic abc", "Bearerabc", "Bearer", "Bearer    ", "abc"] {
            assert_eq!(bearer_token(&with_auth(value)), None, "{value:?}");
        }
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
