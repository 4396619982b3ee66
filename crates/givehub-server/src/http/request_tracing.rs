// SPDX-License-Identifier: Apache-2.0

use std::net::SocketAddr;
use std::sync::atomic::Ordering;

use axum::http::HeaderMap;

use crate::AppState;

/// Per-request identity, attached as a request extension by the tracing
/// middleware and read by handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestContext {
    pub request_id: String,
    pub client_ip: String,
}

pub(crate) fn normalized_header_value(
    headers: &HeaderMap,
    key: &str,
    max_len: usize,
) -> Option<String> {
    let raw = headers.get(key)?.to_str().ok()?.trim();
    if raw.is_empty() || raw.len() > max_len {
        return None;
    }
    Some(raw.to_string())
}

/// First hop of `x-forwarded-for`, when it looks like an address.
pub(crate) fn normalized_forwarded_for(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("x-forwarded-for")?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    if first.is_empty() || first.len() > 64 {
        return None;
    }
    if first
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b':' || b == b'-')
    {
        Some(first.to_string())
    } else {
        None
    }
}

#[must_use]
pub(crate) fn extract_request_context(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    state: &AppState,
) -> RequestContext {
    let request_id = normalized_header_value(headers, "x-request-id", 128).unwrap_or_else(|| {
        let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
        format!("req-{id:016x}")
    });
    let client_ip = normalized_forwarded_for(headers)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string());
    RequestContext {
        request_id,
        client_ip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use givehub_store::Store;

    fn state() -> AppState {
        AppState::new(
            Store::open_in_memory().expect("memory store"),
            crate::ApiConfig::default(),
        )
    }

    #[test]
    fn request_id_header_wins_over_generated_one() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("req-abc"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let ctx = extract_request_context(&headers, None, &state());
        assert_eq!(ctx.request_id, "req-abc");
        assert_eq!(ctx.client_ip, "203.0.113.7");
    }

    #[test]
    fn generated_ids_are_sequential_hex() {
        let state = state();
        let headers = HeaderMap::new();
        let peer: SocketAddr = "127.0.0.1:9000".parse().expect("addr");
        let first = extract_request_context(&headers, Some(peer), &state);
        let second = extract_request_context(&headers, Some(peer), &state);
        assert_eq!(first.request_id, "req-0000000000000001");
        assert_eq!(second.request_id, "req-0000000000000002");
        assert_eq!(first.client_ip, "127.0.0.1");
    }

    #[test]
    fn malformed_forwarded_for_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("<script>, 10.0.0.1"),
        );
        assert_eq!(normalized_forwarded_for(&headers), None);
        let ctx = extract_request_context(&headers, None, &state());
        assert_eq!(ctx.client_ip, "unknown");
    }
}
