// SPDX-License-Identifier: Apache-2.0

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use givehub_api::params::Query as QueryMap;
use givehub_api::{
    parse_page, reject_unknown_params, ApiError, ListDto, SurveyStatusRequest,
    SurveySubmissionRequest,
};
use givehub_model::{NewSurveyForm, SurveyForm, SurveySubmission};

use crate::http::auth::{audit_event, check_public_write_limit, require_user};
use crate::http::request_tracing::RequestContext;
use crate::http::response::{parse_json_body, respond};
use crate::AppState;

async fn create_form(
    state: &AppState,
    ctx: &RequestContext,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<SurveyForm, ApiError> {
    let actor = require_user(state, headers).await?;
    let new: NewSurveyForm = parse_json_body(body, state.api.max_body_bytes)?;
    let form = state
        .with_store(move |store| store.create_form(&actor, new))
        .await?;
    audit_event(state, ctx, "survey.created", &form.slug);
    Ok(form)
}

pub(crate) async fn create_form_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    respond(
        create_form(&state, &ctx, &headers, body).await,
        StatusCode::CREATED,
        &ctx,
    )
}

pub(crate) async fn get_form_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(slug): Path<String>,
) -> Response {
    let result = state.with_store(move |store| store.get_form(&slug)).await;
    respond(result, StatusCode::OK, &ctx)
}

async fn set_form_status(
    state: &AppState,
    ctx: &RequestContext,
    headers: &HeaderMap,
    slug: String,
    body: Result<Bytes, BytesRejection>,
) -> Result<SurveyForm, ApiError> {
    let actor = require_user(state, headers).await?;
    let request: SurveyStatusRequest = parse_json_body(body, state.api.max_body_bytes)?;
    let form = state
        .with_store(move |store| store.set_form_active(&actor, &slug, request.active))
        .await?;
    let event = if form.active {
        "survey.activated"
    } else {
        "survey.deactivated"
    };
    audit_event(state, ctx, event, &form.slug);
    Ok(form)
}

pub(crate) async fn set_form_status_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    respond(
        set_form_status(&state, &ctx, &headers, slug, body).await,
        StatusCode::OK,
        &ctx,
    )
}

async fn submit_survey(
    state: &AppState,
    ctx: &RequestContext,
    slug: String,
    body: Result<Bytes, BytesRejection>,
) -> Result<SurveySubmission, ApiError> {
    check_public_write_limit(state, ctx).await?;
    let request: SurveySubmissionRequest = parse_json_body(body, state.api.max_body_bytes)?;
    state
        .with_store(move |store| {
            store.submit_survey(&slug, &request.answers, request.referral_code.as_deref())
        })
        .await
}

pub(crate) async fn submit_survey_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(slug): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    respond(
        submit_survey(&state, &ctx, slug, body).await,
        StatusCode::CREATED,
        &ctx,
    )
}

async fn list_submissions(
    state: &AppState,
    headers: &HeaderMap,
    slug: String,
    query: &QueryMap,
) -> Result<ListDto<SurveySubmission>, ApiError> {
    let actor = require_user(state, headers).await?;
    reject_unknown_params(query, &["limit", "offset"])?;
    let page = parse_page(query)?;
    let items = state
        .with_store(move |store| store.list_submissions(&actor, &slug, page))
        .await?;
    Ok(ListDto {
        items,
        limit: page.limit,
        offset: page.offset,
    })
}

pub(crate) async fn list_submissions_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Query(query): Query<QueryMap>,
) -> Response {
    respond(
        list_submissions(&state, &headers, slug, &query).await,
        StatusCode::OK,
        &ctx,
    )
}
