// SPDX-License-Identifier: Apache-2.0

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use givehub_api::params::Query as QueryMap;
use givehub_api::{
    parse_donation_filter, parse_highlight_limit, ApiError, CompleteDonationRequest,
    CompletionDto, FailDonationRequest, ListDto, RefundDto,
};
use givehub_model::{Donation, DonationForm, DonationId, DonorHighlight};
use serde_json::{json, Value};
use tracing::info;

use crate::http::auth::{audit_event, check_public_write_limit, require_admin, require_user};
use crate::http::request_tracing::RequestContext;
use crate::http::response::{parse_id, parse_json_body, parse_optional_json_body, respond};
use crate::AppState;

async fn create_donation(
    state: &AppState,
    ctx: &RequestContext,
    body: Result<Bytes, BytesRejection>,
) -> Result<Donation, ApiError> {
    check_public_write_limit(state, ctx).await?;
    let form: DonationForm = parse_json_body(body, state.api.max_body_bytes)?;
    let limits = state.api.donation_limits;
    let donation = state
        .with_store(move |store| store.create_donation(form, &limits))
        .await?;
    info!(donation_id = %donation.id, amount = donation.amount.minor(), "donation created");
    Ok(donation)
}

pub(crate) async fn create_donation_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    respond(
        create_donation(&state, &ctx, body).await,
        StatusCode::CREATED,
        &ctx,
    )
}

async fn list_donations(
    state: &AppState,
    headers: &HeaderMap,
    query: &QueryMap,
) -> Result<ListDto<Donation>, ApiError> {
    let actor = require_user(state, headers).await?;
    let filter = parse_donation_filter(query)?;
    let page = filter.page;
    let items = state
        .with_store(move |store| store.list_donations(&actor, &filter))
        .await?;
    Ok(ListDto {
        items,
        limit: page.limit,
        offset: page.offset,
    })
}

pub(crate) async fn list_donations_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Query(query): Query<QueryMap>,
) -> Response {
    respond(
        list_donations(&state, &headers, &query).await,
        StatusCode::OK,
        &ctx,
    )
}

async fn get_donation(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
) -> Result<Donation, ApiError> {
    let actor = require_user(state, headers).await?;
    let id: DonationId = parse_id(raw_id)?;
    state
        .with_store(move |store| store.view_donation(&actor, id))
        .await
}

pub(crate) async fn get_donation_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Response {
    respond(
        get_donation(&state, &headers, &raw_id).await,
        StatusCode::OK,
        &ctx,
    )
}

async fn complete_donation(
    state: &AppState,
    ctx: &RequestContext,
    headers: &HeaderMap,
    raw_id: &str,
    body: Result<Bytes, BytesRejection>,
) -> Result<CompletionDto, ApiError> {
    require_admin(state, headers).await?;
    let id: DonationId = parse_id(raw_id)?;
    let request: CompleteDonationRequest = parse_json_body(body, state.api.max_body_bytes)?;
    let policy = state.api.commission_policy.clone();
    let completion = state
        .with_store(move |store| store.complete_donation(id, &request.payment_reference, &policy))
        .await?;
    if !completion.replayed {
        audit_event(state, ctx, "donation.completed", &id.to_string());
    }
    Ok(CompletionDto {
        donation: completion.donation,
        commissions: completion.commissions,
        replayed: completion.replayed,
    })
}

pub(crate) async fn complete_donation_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    respond(
        complete_donation(&state, &ctx, &headers, &raw_id, body).await,
        StatusCode::OK,
        &ctx,
    )
}

async fn fail_donation(
    state: &AppState,
    ctx: &RequestContext,
    headers: &HeaderMap,
    raw_id: &str,
    body: Result<Bytes, BytesRejection>,
) -> Result<Donation, ApiError> {
    require_admin(state, headers).await?;
    let id: DonationId = parse_id(raw_id)?;
    let request: FailDonationRequest = parse_optional_json_body(body, state.api.max_body_bytes)?;
    let donation = state
        .with_store(move |store| store.fail_donation(id, request.payment_reference.as_deref()))
        .await?;
    audit_event(state, ctx, "donation.failed", &id.to_string());
    Ok(donation)
}

pub(crate) async fn fail_donation_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    respond(
        fail_donation(&state, &ctx, &headers, &raw_id, body).await,
        StatusCode::OK,
        &ctx,
    )
}

async fn refund_donation(
    state: &AppState,
    ctx: &RequestContext,
    headers: &HeaderMap,
    raw_id: &str,
) -> Result<RefundDto, ApiError> {
    require_admin(state, headers).await?;
    let id: DonationId = parse_id(raw_id)?;
    let (donation, cancelled) = state
        .with_store(move |store| store.refund_donation(id))
        .await?;
    audit_event(state, ctx, "donation.refunded", &id.to_string());
    Ok(RefundDto {
        donation,
        cancelled_commissions: cancelled,
    })
}

pub(crate) async fn refund_donation_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Response {
    respond(
        refund_donation(&state, &ctx, &headers, &raw_id).await,
        StatusCode::OK,
        &ctx,
    )
}

async fn highlights(state: &AppState, query: &QueryMap) -> Result<Value, ApiError> {
    let limit = parse_highlight_limit(query)?;
    let items: Vec<DonorHighlight> = state
        .with_store(move |store| store.donor_highlights(limit))
        .await?;
    Ok(json!({"items": items}))
}

pub(crate) async fn highlights_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<QueryMap>,
) -> Response {
    respond(highlights(&state, &query).await, StatusCode::OK, &ctx)
}
