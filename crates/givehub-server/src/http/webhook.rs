// SPDX-License-Identifier: Apache-2.0

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Extension, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use givehub_api::{ApiError, CompletionDto, PaymentWebhook, WebhookEvent};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{info, warn};

use crate::http::auth::audit_event;
use crate::http::request_tracing::{normalized_header_value, RequestContext};
use crate::http::response::{parse_json_body, respond};
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "x-givehub-signature";

/// Hex HMAC-SHA256 of `body` under `secret`.
pub fn sign_webhook_body(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

fn signature_matches(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

async fn payment_webhook(
    state: &AppState,
    ctx: &RequestContext,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<CompletionDto, ApiError> {
    let Some(secret) = state.api.webhook_secret.as_deref() else {
        return Err(ApiError::not_ready("payment webhook is not configured"));
    };
    let bytes = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::payload_too_large(state.api.max_body_bytes)
        } else {
            ApiError::invalid_body(rejection.body_text())
        }
    })?;
    let signature = normalized_header_value(headers, SIGNATURE_HEADER, 128)
        .ok_or_else(|| ApiError::unauthorized("missing webhook signature"))?;
    if !signature_matches(secret, &bytes, &signature) {
        warn!(client_ip = %ctx.client_ip, "webhook signature mismatch");
        return Err(ApiError::unauthorized("invalid webhook signature"));
    }
    let event: PaymentWebhook = parse_json_body(Ok(bytes), state.api.max_body_bytes)?;
    let id = event.donation_id;
    match event.event {
        WebhookEvent::Captured => {
            let policy = state.api.commission_policy.clone();
            let reference = event.payment_reference;
            let completion = state
                .with_store(move |store| store.complete_donation(id, &reference, &policy))
                .await?;
            info!(
                donation_id = %id,
                commissions = completion.commissions.len(),
                replayed = completion.replayed,
                "payment captured"
            );
            if !completion.replayed {
                audit_event(state, ctx, "donation.completed", &id.to_string());
            }
            Ok(CompletionDto {
                donation: completion.donation,
                commissions: completion.commissions,
                replayed: completion.replayed,
            })
        }
        WebhookEvent::Failed => {
            let reference = event.payment_reference;
            let donation = state
                .with_store(move |store| store.fail_donation(id, Some(&reference)))
                .await?;
            info!(donation_id = %id, "payment failed");
            audit_event(state, ctx, "donation.failed", &id.to_string());
            Ok(CompletionDto {
                donation,
                commissions: Vec::new(),
                replayed: false,
            })
        }
    }
}

pub(crate) async fn payment_webhook_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    respond(
        payment_webhook(&state, &ctx, &headers, body).await,
        StatusCode::OK,
        &ctx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trips_and_rejects_tampering() {
        let secret = "whsec-0123456789abcdef";
        let body = br#"{"donation_id":1,"event":"captured","payment_reference":"pay_1"}"#;
        let sig = sign_webhook_body(secret, body).expect("signature");
        assert_eq!(sig.len(), 64);
        assert!(signature_matches(secret, body, &sig));
        assert!(!signature_matches(secret, b"{}", &sig));
        assert!(!signature_matches("another-secret-value", body, &sig));
        assert!(!signature_matches(secret, body, "not-hex"));
    }
}
