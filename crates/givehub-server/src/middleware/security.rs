// SPDX-License-Identifier: Apache-2.0

use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Method, Request};
use axum::middleware::Next;
use axum::response::Response;
use givehub_api::ApiError;
use tracing::info;

use crate::http::request_tracing::RequestContext;
use crate::http::response::api_error_response;
use crate::AppState;

fn declared_length(req: &Request<Body>) -> Option<usize> {
    req.headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse::<usize>()
        .ok()
}

pub(crate) async fn security_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ctx = req
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_else(|| RequestContext {
            request_id: "req-unknown".to_string(),
            client_ip: "unknown".to_string(),
        });
    if declared_length(&req).is_some_and(|len| len > state.api.max_body_bytes) {
        return api_error_response(
            ApiError::payload_too_large(state.api.max_body_bytes),
            &ctx.request_id,
        );
    }

    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let resp = next.run(req).await;
    let changes_state = !matches!(method, Method::GET | Method::HEAD | Method::OPTIONS);
    if state.api.enable_audit_log && changes_state {
        info!(
            target: "givehub_audit",
            method = %method,
            path = %path,
            status = resp.status().as_u16(),
            request_id = %ctx.request_id,
            client_ip = %ctx.client_ip,
            latency_ms = started.elapsed().as_millis() as u64,
            "audit"
        );
    }
    resp
}
