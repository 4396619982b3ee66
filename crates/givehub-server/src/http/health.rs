// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::Ordering;

use axum::extract::{Extension, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use givehub_api::{ApiError, VersionDto, API_VERSION};

use crate::http::request_tracing::RequestContext;
use crate::http::response::api_error_response;
use crate::AppState;

pub(crate) async fn healthz_handler() -> Response {
    (StatusCode::OK, "ok").into_response()
}

pub(crate) async fn readyz_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    if !state.ready.load(Ordering::Relaxed) {
        return api_error_response(ApiError::not_ready("draining"), &ctx.request_id);
    }
    match state.with_store(|store| store.ping()).await {
        Ok(()) => (StatusCode::OK, "ready").into_response(),
        Err(_) => api_error_response(ApiError::not_ready("database unavailable"), &ctx.request_id),
    }
}

pub(crate) async fn version_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    let schema_version = match state.with_store(|store| store.schema_version()).await {
        Ok(v) => v,
        Err(err) => return api_error_response(err, &ctx.request_id),
    };
    let payload = VersionDto {
        name: "givehub".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        api_version: API_VERSION.to_string(),
        schema_version,
    };
    let mut response = Json(payload).into_response();
    response
        .headers_mut()
        .insert("cache-control", HeaderValue::from_static("public, max-age=30"));
    response
}
