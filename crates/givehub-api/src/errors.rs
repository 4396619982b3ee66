// SPDX-License-Identifier: Apache-2.0

use givehub_model::{DomainError, ValidationError};
use givehub_store::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ApiErrorCode {
    ValidationFailed,
    InvalidQueryParameter,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    InvalidTransition,
    TargetOverflow,
    UnknownReferralCode,
    RateLimited,
    PayloadTooLarge,
    NotReady,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
    pub request_id: String,
}

/// `{"error": ApiError}`, the body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiErrorEnvelope {
    pub error: ApiError,
}

impl ApiError {
    #[must_use]
    pub fn new(
        code: ApiErrorCode,
        message: impl Into<String>,
        details: Value,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            request_id: request_id.into(),
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    #[must_use]
    pub fn invalid_param(name: &str, value: &str) -> Self {
        Self::new(
            ApiErrorCode::InvalidQueryParameter,
            format!("invalid query parameter: {name}"),
            json!({"field_errors": [{"parameter": name, "reason": "invalid", "value": value}]}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn validation_failed(errors: &[ValidationError]) -> Self {
        let field_errors: Vec<Value> = errors
            .iter()
            .map(|e| json!({"field": e.field, "reason": e.reason}))
            .collect();
        Self::new(
            ApiErrorCode::ValidationFailed,
            "validation failed",
            json!({"field_errors": field_errors}),
            "req-unknown",
        )
    }

    /// Body could not be parsed as the expected JSON document.
    #[must_use]
    pub fn invalid_body(reason: impl Into<String>) -> Self {
        Self::new(
            ApiErrorCode::ValidationFailed,
            "invalid request body",
            json!({"field_errors": [{"field": "body", "reason": reason.into()}]}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Unauthorized, message, json!({}), "req-unknown")
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Forbidden, message, json!({}), "req-unknown")
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, message, json!({}), "req-unknown")
    }

    #[must_use]
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::new(
            ApiErrorCode::RateLimited,
            "rate limit exceeded",
            json!({"retry_after_secs": retry_after_secs}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            ApiErrorCode::PayloadTooLarge,
            "request body too large",
            json!({"max_body_bytes": limit}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self::new(
            ApiErrorCode::NotReady,
            "service not ready",
            json!({"reason": reason.into()}),
            "req-unknown",
        )
    }

    /// Never echoes internal causes to clients; log them instead.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(ApiErrorCode::Internal, "internal error", json!({}), "req-unknown")
    }

    #[must_use]
    pub fn from_domain(err: &DomainError) -> Self {
        match err {
            DomainError::Validation(errors) => Self::validation_failed(errors),
            DomainError::Forbidden(message) => Self::forbidden(message.clone()),
            DomainError::NotFound { entity, id } => Self::new(
                ApiErrorCode::NotFound,
                err.to_string(),
                json!({"entity": entity, "id": id}),
                "req-unknown",
            ),
            DomainError::Conflict(message) => {
                Self::new(ApiErrorCode::Conflict, message.clone(), json!({}), "req-unknown")
            }
            DomainError::InvalidTransition { entity, from, to } => Self::new(
                ApiErrorCode::InvalidTransition,
                err.to_string(),
                json!({"entity": entity, "from": from, "to": to}),
                "req-unknown",
            ),
            DomainError::TargetOverflow {
                parent,
                allocated,
                requested,
            } => Self::new(
                ApiErrorCode::TargetOverflow,
                "allocations exceed the parent target",
                json!({
                    "parent": parent.minor(),
                    "allocated": allocated.minor(),
                    "requested": requested.minor(),
                    "available": parent.saturating_sub(*allocated).minor(),
                }),
                "req-unknown",
            ),
            DomainError::UnknownReferralCode(code) => Self::new(
                ApiErrorCode::UnknownReferralCode,
                err.to_string(),
                json!({"referral_code": code}),
                "req-unknown",
            ),
            // Unreachable today; required because `DomainError` is `#[non_exhaustive]`.
            _ => Self::internal(),
        }
    }

    #[must_use]
    pub fn from_store(err: &StoreError) -> Self {
        match err.domain() {
            Some(domain) => Self::from_domain(domain),
            None => Self::internal(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        Self::from_domain(&value)
    }
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        Self::validation_failed(std::slice::from_ref(&value))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
