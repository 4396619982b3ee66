// SPDX-License-Identifier: Apache-2.0

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use givehub_api::params::Query as QueryMap;
use givehub_api::{reject_unknown_params, ApiError, DivideTargetRequest, DivisionDto};
use givehub_model::{NewTarget, Target, TargetId, TargetProgress, UserId};
use serde_json::{json, Value};

use crate::http::auth::{audit_event, require_user};
use crate::http::request_tracing::RequestContext;
use crate::http::response::{parse_id, parse_json_body, respond};
use crate::AppState;

async fn assign_target(
    state: &AppState,
    ctx: &RequestContext,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Target, ApiError> {
    let actor = require_user(state, headers).await?;
    let new: NewTarget = parse_json_body(body, state.api.max_body_bytes)?;
    let target = state
        .with_store(move |store| store.assign_target(&actor, &new))
        .await?;
    audit_event(state, ctx, "target.assigned", &target.id.to_string());
    Ok(target)
}

pub(crate) async fn assign_target_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    respond(
        assign_target(&state, &ctx, &headers, body).await,
        StatusCode::CREATED,
        &ctx,
    )
}

async fn list_targets(
    state: &AppState,
    headers: &HeaderMap,
    query: &QueryMap,
) -> Result<Value, ApiError> {
    let actor = require_user(state, headers).await?;
    reject_unknown_params(query, &["user"])?;
    let user = match query.get("user") {
        Some(raw) => raw
            .parse::<UserId>()
            .map_err(|_| ApiError::invalid_param("user", raw))?,
        None => actor.id,
    };
    let targets = state
        .with_store(move |store| store.list_targets(&actor, user))
        .await?;
    Ok(json!({"items": targets}))
}

pub(crate) async fn list_targets_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Query(query): Query<QueryMap>,
) -> Response {
    respond(
        list_targets(&state, &headers, &query).await,
        StatusCode::OK,
        &ctx,
    )
}

async fn get_target(state: &AppState, headers: &HeaderMap, raw_id: &str) -> Result<Target, ApiError> {
    let actor = require_user(state, headers).await?;
    let id: TargetId = parse_id(raw_id)?;
    state.with_store(move |store| store.get_target(&actor, id)).await
}

pub(crate) async fn get_target_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Response {
    respond(get_target(&state, &headers, &raw_id).await, StatusCode::OK, &ctx)
}

async fn divide_target(
    state: &AppState,
    ctx: &RequestContext,
    headers: &HeaderMap,
    raw_id: &str,
    body: Result<Bytes, BytesRejection>,
) -> Result<DivisionDto, ApiError> {
    let actor = require_user(state, headers).await?;
    let id: TargetId = parse_id(raw_id)?;
    let request: DivideTargetRequest = parse_json_body(body, state.api.max_body_bytes)?;
    let division = state
        .with_store(move |store| store.divide_target(&actor, id, &request.allocations))
        .await?;
    audit_event(state, ctx, "target.divided", &id.to_string());
    Ok(DivisionDto {
        children: division.children,
        plan: division.plan,
    })
}

pub(crate) async fn divide_target_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    respond(
        divide_target(&state, &ctx, &headers, &raw_id, body).await,
        StatusCode::CREATED,
        &ctx,
    )
}

async fn target_progress(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
) -> Result<TargetProgress, ApiError> {
    let actor = require_user(state, headers).await?;
    let id: TargetId = parse_id(raw_id)?;
    state
        .with_store(move |store| store.target_progress(&actor, id))
        .await
}

pub(crate) async fn target_progress_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Response {
    respond(
        target_progress(&state, &headers, &raw_id).await,
        StatusCode::OK,
        &ctx,
    )
}
