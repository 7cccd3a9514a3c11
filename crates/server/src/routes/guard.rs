use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::errors::ApiError;
use crate::routes::AppState;

fn provided_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(k) = headers.get("X-API-Key").and_then(|v| v.to_str().ok()) {
        return Some(k);
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Compare without short-circuiting on the first differing byte, so the
/// response time does not reveal how much of the key matched.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Middleware: when an API key is configured, require it via `X-API-Key`
/// or `Authorization: Bearer`. Without a configured key the routes are open.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.settings.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };
    let authorized = provided_key(req.headers())
        .is_some_and(|given| keys_match(given.as_bytes(), expected.as_bytes()));
    if !authorized {
        warn!(path = %req.uri().path(), "storage request without valid api key");
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_header_then_bearer() {
        let mut headers = HeaderMap::new();
        assert_eq!(provided_key(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(provided_key(&headers), Some("abc"));

        headers.insert("X-API-Key", HeaderValue::from_static("xyz"));
        assert_eq!(provided_key(&headers), Some("xyz"));

        let mut basic = HeaderMap::new();
        basic.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(provided_key(&basic), None);
    }

    #[test]
    fn key_comparison_requires_exact_match() {
        assert!(keys_match(b"s3cret", b"s3cret"));
        assert!(!keys_match(b"s3cres", b"s3cret"));
        assert!(!keys_match(b"t3cret", b"s3cret"));
        assert!(!keys_match(b"s3cre", b"s3cret"));
        assert!(!keys_match(b"s3crets", b"s3cret"));
        assert!(!keys_match(b"", b"s3cret"));
        assert!(keys_match(b"", b""));
    }
}
