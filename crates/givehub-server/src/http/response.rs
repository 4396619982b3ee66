// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use givehub_api::error_mapping::map_error;
use givehub_api::ApiError;
use givehub_model::ValidationError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::http::request_tracing::RequestContext;

#[must_use]
pub(crate) fn api_error_response(err: ApiError, request_id: &str) -> Response {
    let status = StatusCode::from_u16(map_error(&err).status_code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let err = err.with_request_id(request_id);
    let mut resp = (status, Json(json!({"error": err}))).into_response();
    if matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
    ) {
        resp.headers_mut()
            .insert("retry-after", HeaderValue::from_static("3"));
    }
    resp
}

#[must_use]
pub(crate) fn respond<T: Serialize>(
    result: Result<T, ApiError>,
    status: StatusCode,
    ctx: &RequestContext,
) -> Response {
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(err) => api_error_response(err, &ctx.request_id),
    }
}

fn body_bytes(body: Result<Bytes, BytesRejection>, limit: usize) -> Result<Bytes, ApiError> {
    body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::payload_too_large(limit)
        } else {
            ApiError::invalid_body(rejection.body_text())
        }
    })
}

pub(crate) fn parse_json_body<T: DeserializeOwned>(
    body: Result<Bytes, BytesRejection>,
    limit: usize,
) -> Result<T, ApiError> {
    let bytes = body_bytes(body, limit)?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::invalid_body(e.to_string()))
}

/// Like [`parse_json_body`], but an empty body yields `T::default()`.
pub(crate) fn parse_optional_json_body<T: DeserializeOwned + Default>(
    body: Result<Bytes, BytesRejection>,
    limit: usize,
) -> Result<T, ApiError> {
    let bytes = body_bytes(body, limit)?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes).map_err(|e| ApiError::invalid_body(e.to_string()))
}

pub(crate) fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = ValidationError>,
{
    raw.parse::<T>().map_err(ApiError::from)
}
