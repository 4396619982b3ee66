// SPDX-License-Identifier: Apache-2.0

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use givehub_api::params::Query as QueryMap;
use givehub_api::{parse_commission_filter, reject_unknown_params, ApiError, ListDto, PayoutRequest};
use givehub_model::{CommissionId, CommissionLog, CommissionSummary, CommissionUpdate, UserId};
use serde_json::{json, Value};

use crate::http::auth::{audit_event, require_user};
use crate::http::request_tracing::RequestContext;
use crate::http::response::{parse_id, parse_json_body, respond};
use crate::AppState;

async fn list_commissions(
    state: &AppState,
    headers: &HeaderMap,
    query: &QueryMap,
) -> Result<ListDto<CommissionLog>, ApiError> {
    let actor = require_user(state, headers).await?;
    let filter = parse_commission_filter(query)?;
    let page = filter.page;
    let items = state
        .with_store(move |store| store.list_commissions(&actor, &filter))
        .await?;
    Ok(ListDto {
        items,
        limit: page.limit,
        offset: page.offset,
    })
}

pub(crate) async fn list_commissions_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Query(query): Query<QueryMap>,
) -> Response {
    respond(
        list_commissions(&state, &headers, &query).await,
        StatusCode::OK,
        &ctx,
    )
}

async fn commission_summary(
    state: &AppState,
    headers: &HeaderMap,
    query: &QueryMap,
) -> Result<CommissionSummary, ApiError> {
    let actor = require_user(state, headers).await?;
    reject_unknown_params(query, &["user"])?;
    let user = match query.get("user") {
        Some(raw) => raw
            .parse::<UserId>()
            .map_err(|_| ApiError::invalid_param("user", raw))?,
        None => actor.id,
    };
    state
        .with_store(move |store| store.commission_summary(&actor, user))
        .await
}

pub(crate) async fn commission_summary_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Query(query): Query<QueryMap>,
) -> Response {
    respond(
        commission_summary(&state, &headers, &query).await,
        StatusCode::OK,
        &ctx,
    )
}

async fn update_commission_status(
    state: &AppState,
    ctx: &RequestContext,
    headers: &HeaderMap,
    raw_id: &str,
    body: Result<Bytes, BytesRejection>,
) -> Result<CommissionLog, ApiError> {
    let actor = require_user(state, headers).await?;
    let id: CommissionId = parse_id(raw_id)?;
    let update: CommissionUpdate = parse_json_body(body, state.api.max_body_bytes)?;
    let log = state
        .with_store(move |store| store.update_commission_status(&actor, id, &update))
        .await?;
    audit_event(
        state,
        ctx,
        &format!("commission.{}", log.status.as_str().to_ascii_lowercase()),
        &id.to_string(),
    );
    Ok(log)
}

pub(crate) async fn update_commission_status_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    respond(
        update_commission_status(&state, &ctx, &headers, &raw_id, body).await,
        StatusCode::OK,
        &ctx,
    )
}

async fn record_payout(
    state: &AppState,
    ctx: &RequestContext,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Value, ApiError> {
    let actor = require_user(state, headers).await?;
    let request: PayoutRequest = parse_json_body(body, state.api.max_body_bytes)?;
    let reference = request.payment_reference.clone();
    let paid = state
        .with_store(move |store| {
            store.record_payout(&actor, &request.commission_ids, &request.payment_reference)
        })
        .await?;
    audit_event(state, ctx, "commission.payout", &reference);
    Ok(json!({"items": paid}))
}

pub(crate) async fn record_payout_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    respond(
        record_payout(&state, &ctx, &headers, body).await,
        StatusCode::OK,
        &ctx,
    )
}
