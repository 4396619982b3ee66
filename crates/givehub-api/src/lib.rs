// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Wire contract of the givehub HTTP API: request and response bodies,
//! query-parameter parsing and the error envelope.

pub mod dto;
pub mod error_mapping;
mod errors;
pub mod params;

pub use dto::*;
pub use errors::{ApiError, ApiErrorCode, ApiErrorEnvelope};
pub use params::{
    parse_commission_filter, parse_donation_filter, parse_email, parse_highlight_limit,
    parse_page, parse_scope, reject_unknown_params,
};

pub const CRATE_NAME: &str = "givehub-api";
pub const API_VERSION: &str = "v1";
