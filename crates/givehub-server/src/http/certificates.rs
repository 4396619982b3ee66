// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Extension, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use givehub_api::params::Query as QueryMap;
use givehub_api::{
    parse_email, reject_unknown_params, ApiError, CertificateDto, VerificationDto,
};
use givehub_model::{render_certificate_html, DonationId};
use givehub_store::Certificate;

use crate::http::auth::optional_user;
use crate::http::request_tracing::RequestContext;
use crate::http::response::{api_error_response, parse_id, respond};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CertificateFormat {
    Html,
    Json,
}

fn parse_format(query: &QueryMap) -> Result<CertificateFormat, ApiError> {
    match query.get("format").map(String::as_str) {
        None | Some("html") => Ok(CertificateFormat::Html),
        Some("json") => Ok(CertificateFormat::Json),
        Some(other) => Err(ApiError::invalid_param("format", other)),
    }
}

async fn donation_certificate(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
    query: &QueryMap,
) -> Result<(Certificate, CertificateFormat), ApiError> {
    reject_unknown_params(query, &["email", "format"])?;
    let format = parse_format(query)?;
    let email = parse_email(query)?;
    let id: DonationId = parse_id(raw_id)?;
    let actor = optional_user(state, headers).await?;
    if actor.is_none() && email.is_none() {
        return Err(ApiError::unauthorized(
            "a bearer token or the donor email is required",
        ));
    }
    let organization = state.api.organization.clone();
    let certificate = state
        .with_store(move |store| {
            store.certificate_for(actor.as_ref(), email.as_deref(), id, &organization)
        })
        .await?;
    Ok((certificate, format))
}

pub(crate) async fn donation_certificate_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    Query(query): Query<QueryMap>,
) -> Response {
    match donation_certificate(&state, &headers, &raw_id, &query).await {
        Ok((cert, CertificateFormat::Json)) => Json(CertificateDto {
            certificate: cert.record,
            payload: cert.payload,
        })
        .into_response(),
        Ok((cert, CertificateFormat::Html)) => {
            let html = render_certificate_html(&cert.payload, &cert.record.content_hash);
            let mut resp = (StatusCode::OK, html).into_response();
            resp.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
            resp
        }
        Err(err) => api_error_response(err, &ctx.request_id),
    }
}

async fn verify_certificate(
    state: &AppState,
    number: String,
    query: &QueryMap,
) -> Result<VerificationDto, ApiError> {
    reject_unknown_params(query, &["hash"])?;
    let hash = query
        .get("hash")
        .map(|h| h.trim().to_ascii_lowercase())
        .filter(|h| h.len() == 64 && h.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| {
            ApiError::invalid_param("hash", query.get("hash").map_or("", String::as_str))
        })?;
    let lookup = number.clone();
    let valid = state
        .with_store(move |store| store.verify_certificate(&lookup, &hash))
        .await?;
    Ok(VerificationDto { number, valid })
}

pub(crate) async fn verify_certificate_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(number): Path<String>,
    Query(query): Query<QueryMap>,
) -> Response {
    respond(
        verify_certificate(&state, number, &query).await,
        StatusCode::OK,
        &ctx,
    )
}
