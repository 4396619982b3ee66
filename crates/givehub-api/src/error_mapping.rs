// SPDX-License-Identifier: Apache-2.0

use crate::{ApiError, ApiErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiErrorMapping {
    pub status_code: u16,
}

#[must_use]
pub fn status_for(code: ApiErrorCode) -> u16 {
    match code {
        ApiErrorCode::ValidationFailed
        | ApiErrorCode::InvalidQueryParameter
        | ApiErrorCode::UnknownReferralCode => 400,
        ApiErrorCode::Unauthorized => 401,
        ApiErrorCode::Forbidden => 403,
        ApiErrorCode::NotFound => 404,
        ApiErrorCode::Conflict | ApiErrorCode::InvalidTransition => 409,
        ApiErrorCode::PayloadTooLarge => 413,
        ApiErrorCode::TargetOverflow => 422,
        ApiErrorCode::RateLimited => 429,
        ApiErrorCode::NotReady => 503,
        ApiErrorCode::Internal => 500,
    }
}

#[must_use]
pub fn map_error(error: &ApiError) -> ApiErrorMapping {
    ApiErrorMapping {
        status_code: status_for(error.code),
    }
}
