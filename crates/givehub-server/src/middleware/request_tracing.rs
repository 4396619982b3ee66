// SPDX-License-Identifier: Apache-2.0

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;

use crate::http::request_tracing::extract_request_context;
use crate::AppState;

pub(crate) async fn request_tracing_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let route = request.uri().path().to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let ctx = extract_request_context(request.headers(), peer, &state);
    let request_id = ctx.request_id.clone();

    let span = tracing::info_span!(
        "http.request",
        request_id = %ctx.request_id,
        method = %method,
        route = %route,
    );
    request.extensions_mut().insert(ctx);

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}
