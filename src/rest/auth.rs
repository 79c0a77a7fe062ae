//! Bearer-token checks.
//!
//! A configured `auth_token` gates every endpoint except `/api/health`.
//! With `nfc_public` set, the `/api/nfc/*` family is additionally open so a
//! dumb reader that can't hold a secret can still post scans.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use super::error::ApiError;
use crate::AppContext;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

pub fn require_auth(ctx: &AppContext, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = ctx.config.auth_token.as_deref() else {
        return Ok(()); // auth disabled
    };
    match bearer_token(headers) {
        Some(token) if token == expected => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}

pub fn require_nfc_auth(ctx: &AppContext, headers: &HeaderMap) -> Result<(), ApiError> {
    if ctx.config.nfc_public {
        return Ok(());
    }
    require_auth(ctx, headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));
    }

    #[test]
    fn rejects_non_bearer_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
