// SPDX-License-Identifier: Apache-2.0

use axum::http::{header, HeaderMap};
use givehub_api::ApiError;
use givehub_model::User;
use tracing::info;

use crate::http::request_tracing::RequestContext;
use crate::AppState;

const MAX_TOKEN_LEN: usize = 256;

/// The token of an `authorization: Bearer <token>` header.
///
/// `Err` means a header was sent but is not a usable bearer credential.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(raw) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let text = raw
        .to_str()
        .map_err(|_| ApiError::unauthorized("malformed authorization header"))?
        .trim();
    let token = text
        .strip_prefix("Bearer ")
        .or_else(|| text.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty() && t.len() <= MAX_TOKEN_LEN)
        .ok_or_else(|| ApiError::unauthorized("expected a bearer token"))?;
    Ok(Some(token.to_string()))
}

/// Resolves the caller when a token is presented; a bad token is an error
/// even on endpoints that also serve anonymous callers.
pub(crate) async fn optional_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<User>, ApiError> {
    let Some(token) = bearer_token(headers)? else {
        return Ok(None);
    };
    let user = state
        .with_store(move |store| store.authenticate(&token))
        .await?;
    match user {
        Some(user) => Ok(Some(user)),
        None => Err(ApiError::unauthorized("invalid or revoked token")),
    }
}

pub(crate) async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    optional_user(state, headers)
        .await?
        .ok_or_else(|| ApiError::unauthorized("authentication required"))
}

pub(crate) async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let user = require_user(state, headers).await?;
    if user.role.is_admin() {
        Ok(user)
    } else {
        Err(ApiError::forbidden("admin role required"))
    }
}

/// Token bucket per client IP for unauthenticated writes.
pub(crate) async fn check_public_write_limit(
    state: &AppState,
    ctx: &RequestContext,
) -> Result<(), ApiError> {
    let cfg = &state.api.public_write_rate_limit;
    if state.write_limiter.allow(&ctx.client_ip, cfg).await {
        Ok(())
    } else {
        Err(ApiError::rate_limited(3))
    }
}

/// One audit line per domain state change.
pub(crate) fn audit_event(state: &AppState, ctx: &RequestContext, event: &str, subject: &str) {
    if state.api.enable_audit_log {
        info!(
            target: "givehub_audit",
            event = %event,
            subject = %subject,
            request_id = %ctx.request_id,
            client_ip = %ctx.client_ip,
            "state change"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use givehub_api::ApiErrorCode;

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers).expect("no header"), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(
            bearer_token(&headers).expect("bearer"),
            Some("abc123".to_string())
        );

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        let err = bearer_token(&headers).expect_err("basic auth");
        assert_eq!(err.code, ApiErrorCode::Unauthorized);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert!(bearer_token(&headers).is_err());
    }
}
