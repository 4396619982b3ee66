// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use givehub_model::{normalize_email, SubordinateScope, UserId};
use givehub_store::{
    CommissionFilter, DonationFilter, Page, DEFAULT_HIGHLIGHTS, DEFAULT_PAGE_LIMIT,
    MAX_HIGHLIGHTS, MAX_PAGE_LIMIT,
};

use crate::ApiError;

pub type Query = BTreeMap<String, String>;

/// Rejects parameters an endpoint does not understand.
pub fn reject_unknown_params(query: &Query, allowed: &[&str]) -> Result<(), ApiError> {
    match query.iter().find(|(k, _)| !allowed.contains(&k.as_str())) {
        Some((key, value)) => Err(ApiError::invalid_param(key, value)),
        None => Ok(()),
    }
}

fn parse_bounded(query: &Query, name: &str, default: u32, min: u32, max: u32) -> Result<u32, ApiError> {
    let Some(raw) = query.get(name) else {
        return Ok(default);
    };
    match raw.trim().parse::<u32>() {
        Ok(value) if (min..=max).contains(&value) => Ok(value),
        _ => Err(ApiError::invalid_param(name, raw)),
    }
}

fn parse_parsed<T: std::str::FromStr>(query: &Query, name: &str) -> Result<Option<T>, ApiError> {
    query
        .get(name)
        .map(|raw| raw.parse::<T>().map_err(|_| ApiError::invalid_param(name, raw)))
        .transpose()
}

/// `limit` in `1..=200` (default 50) and `offset` (default 0).
pub fn parse_page(query: &Query) -> Result<Page, ApiError> {
    Ok(Page {
        limit: parse_bounded(query, "limit", DEFAULT_PAGE_LIMIT, 1, MAX_PAGE_LIMIT)?,
        offset: parse_bounded(query, "offset", 0, 0, u32::MAX)?,
    })
}

pub fn parse_donation_filter(query: &Query) -> Result<DonationFilter, ApiError> {
    reject_unknown_params(query, &["status", "referrer", "limit", "offset"])?;
    Ok(DonationFilter {
        status: parse_parsed(query, "status")?,
        referrer: parse_parsed::<UserId>(query, "referrer")?,
        page: parse_page(query)?,
    })
}

pub fn parse_commission_filter(query: &Query) -> Result<CommissionFilter, ApiError> {
    reject_unknown_params(query, &["status", "beneficiary", "limit", "offset"])?;
    Ok(CommissionFilter {
        status: parse_parsed(query, "status")?,
        beneficiary: parse_parsed::<UserId>(query, "beneficiary")?,
        page: parse_page(query)?,
    })
}

pub fn parse_scope(query: &Query) -> Result<SubordinateScope, ApiError> {
    reject_unknown_params(query, &["scope"])?;
    Ok(parse_parsed(query, "scope")?.unwrap_or_default())
}

pub fn parse_highlight_limit(query: &Query) -> Result<u32, ApiError> {
    reject_unknown_params(query, &["limit"])?;
    parse_bounded(query, "limit", DEFAULT_HIGHLIGHTS, 1, MAX_HIGHLIGHTS)
}

/// Optional `email` used to claim a donor's own certificate.
pub fn parse_email(query: &Query) -> Result<Option<String>, ApiError> {
    query
        .get("email")
        .map(|raw| normalize_email(raw).map_err(|_| ApiError::invalid_param("email", raw)))
        .transpose()
}
