// SPDX-License-Identifier: Apache-2.0

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use givehub_api::params::Query as QueryMap;
use givehub_api::{parse_scope, ApiError, CreatedUserDto, ReassignParentRequest, TokenDto};
use givehub_model::{NewUser, PublicReferral, User, UserId};
use serde_json::{json, Value};

use crate::http::auth::{audit_event, require_user};
use crate::http::request_tracing::RequestContext;
use crate::http::response::{parse_id, parse_json_body, respond};
use crate::AppState;

async fn create_user(
    state: &AppState,
    ctx: &RequestContext,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<CreatedUserDto, ApiError> {
    let actor = require_user(state, headers).await?;
    let new: NewUser = parse_json_body(body, state.api.max_body_bytes)?;
    let (user, token) = state
        .with_store(move |store| store.create_user(&actor, new))
        .await?;
    audit_event(state, ctx, "user.created", &user.id.to_string());
    Ok(CreatedUserDto { user, token })
}

pub(crate) async fn create_user_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    respond(
        create_user(&state, &ctx, &headers, body).await,
        StatusCode::CREATED,
        &ctx,
    )
}

pub(crate) async fn me_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
) -> Response {
    respond(require_user(&state, &headers).await, StatusCode::OK, &ctx)
}

async fn get_user(state: &AppState, headers: &HeaderMap, raw_id: &str) -> Result<User, ApiError> {
    let actor = require_user(state, headers).await?;
    let id: UserId = parse_id(raw_id)?;
    state.with_store(move |store| store.view_user(&actor, id)).await
}

pub(crate) async fn get_user_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Response {
    respond(get_user(&state, &headers, &raw_id).await, StatusCode::OK, &ctx)
}

async fn subordinates(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
    query: &QueryMap,
) -> Result<Value, ApiError> {
    let actor = require_user(state, headers).await?;
    let id: UserId = parse_id(raw_id)?;
    let scope = parse_scope(query)?;
    let users = state
        .with_store(move |store| store.list_subordinates(&actor, id, scope))
        .await?;
    Ok(json!({"items": users}))
}

pub(crate) async fn subordinates_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    Query(query): Query<QueryMap>,
) -> Response {
    respond(
        subordinates(&state, &headers, &raw_id, &query).await,
        StatusCode::OK,
        &ctx,
    )
}

async fn deactivate_user(
    state: &AppState,
    ctx: &RequestContext,
    headers: &HeaderMap,
    raw_id: &str,
) -> Result<User, ApiError> {
    let actor = require_user(state, headers).await?;
    let id: UserId = parse_id(raw_id)?;
    let user = state
        .with_store(move |store| store.deactivate_user(&actor, id))
        .await?;
    audit_event(state, ctx, "user.deactivated", &id.to_string());
    Ok(user)
}

pub(crate) async fn deactivate_user_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Response {
    respond(
        deactivate_user(&state, &ctx, &headers, &raw_id).await,
        StatusCode::OK,
        &ctx,
    )
}

async fn reassign_parent(
    state: &AppState,
    ctx: &RequestContext,
    headers: &HeaderMap,
    raw_id: &str,
    body: Result<Bytes, BytesRejection>,
) -> Result<User, ApiError> {
    let actor = require_user(state, headers).await?;
    let id: UserId = parse_id(raw_id)?;
    let request: ReassignParentRequest = parse_json_body(body, state.api.max_body_bytes)?;
    let user = state
        .with_store(move |store| store.reassign_parent(&actor, id, request.parent_id))
        .await?;
    audit_event(state, ctx, "user.reparented", &id.to_string());
    Ok(user)
}

pub(crate) async fn reassign_parent_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    respond(
        reassign_parent(&state, &ctx, &headers, &raw_id, body).await,
        StatusCode::OK,
        &ctx,
    )
}

async fn rotate_token(
    state: &AppState,
    ctx: &RequestContext,
    headers: &HeaderMap,
    raw_id: &str,
) -> Result<TokenDto, ApiError> {
    let actor = require_user(state, headers).await?;
    let id: UserId = parse_id(raw_id)?;
    let token = state
        .with_store(move |store| store.rotate_token(&actor, id))
        .await?;
    audit_event(state, ctx, "user.token_rotated", &id.to_string());
    Ok(TokenDto { user_id: id, token })
}

pub(crate) async fn rotate_token_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Response {
    respond(
        rotate_token(&state, &ctx, &headers, &raw_id).await,
        StatusCode::OK,
        &ctx,
    )
}

async fn resolve_referral(state: &AppState, code: String) -> Result<PublicReferral, ApiError> {
    state
        .with_store(move |store| store.resolve_referral(&code))
        .await
}

pub(crate) async fn resolve_referral_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(code): Path<String>,
) -> Response {
    respond(resolve_referral(&state, code).await, StatusCode::OK, &ctx)
}
