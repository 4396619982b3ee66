// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Extension, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use givehub_api::ApiError;
use givehub_model::{AdminDashboard, MemberDashboard};

use crate::http::auth::require_user;
use crate::http::request_tracing::RequestContext;
use crate::http::response::respond;
use crate::AppState;

async fn admin_dashboard(state: &AppState, headers: &HeaderMap) -> Result<AdminDashboard, ApiError> {
    let actor = require_user(state, headers).await?;
    state
        .with_store(move |store| store.admin_dashboard(&actor))
        .await
}

pub(crate) async fn admin_dashboard_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
) -> Response {
    respond(admin_dashboard(&state, &headers).await, StatusCode::OK, &ctx)
}

async fn member_dashboard(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<MemberDashboard, ApiError> {
    let actor = require_user(state, headers).await?;
    state
        .with_store(move |store| store.member_dashboard(&actor))
        .await
}

pub(crate) async fn member_dashboard_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
) -> Response {
    respond(member_dashboard(&state, &headers).await, StatusCode::OK, &ctx)
}
