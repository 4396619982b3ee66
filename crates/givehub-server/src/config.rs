// SPDX-License-Identifier: Apache-2.0

use givehub_core::DEFAULT_ORGANIZATION;
use givehub_model::{Amount, CommissionPolicy, DonationLimits};
use serde::Serialize;

pub const CONFIG_SCHEMA_VERSION: &str = "1";
pub const MAX_BODY_BYTES_CEILING: usize = 1024 * 1024;
pub const MIN_WEBHOOK_SECRET_LEN: usize = 16;

#[derive(Debug, Clone, Serialize)]
pub struct RateLimitConfig {
    pub capacity: f64,
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 20.0,
            refill_per_sec: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    pub max_body_bytes: usize,
    /// Token bucket applied per client IP to unauthenticated writes.
    pub public_write_rate_limit: RateLimitConfig,
    #[serde(skip_serializing)]
    pub webhook_secret: Option<String>,
    pub organization: String,
    pub donation_limits: DonationLimits,
    pub commission_policy: CommissionPolicy,
    pub enable_audit_log: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 16 * 1024,
            public_write_rate_limit: RateLimitConfig::default(),
            webhook_secret: None,
            organization: DEFAULT_ORGANIZATION.to_string(),
            donation_limits: DonationLimits::default(),
            commission_policy: CommissionPolicy::default(),
            enable_audit_log: false,
        }
    }
}

pub fn validate_startup_config(api: &ApiConfig) -> Result<(), String> {
    if api.max_body_bytes == 0 || api.max_body_bytes > MAX_BODY_BYTES_CEILING {
        return Err(format!(
            "max_body_bytes must be in 1..={MAX_BODY_BYTES_CEILING}"
        ));
    }
    let rl = &api.public_write_rate_limit;
    if !(rl.capacity >= 1.0 && rl.capacity.is_finite()) {
        return Err("rate limit capacity must be >= 1".to_string());
    }
    if !(rl.refill_per_sec > 0.0 && rl.refill_per_sec.is_finite()) {
        return Err("rate limit refill_per_sec must be > 0".to_string());
    }
    if api.organization.trim().is_empty() {
        return Err("organization name must not be empty".to_string());
    }
    let limits = &api.donation_limits;
    if limits.min_amount.is_zero() || limits.min_amount > limits.max_amount {
        return Err("donation limits require 0 < min_amount <= max_amount".to_string());
    }
    if !limits.max_amount.is_storable() {
        return Err(format!(
            "donation max_amount must not exceed {} paise",
            Amount::MAX_STORABLE.minor()
        ));
    }
    api.commission_policy
        .validate()
        .map_err(|e| format!("invalid commission policy: {e}"))?;
    if let Some(secret) = &api.webhook_secret {
        if secret.len() < MIN_WEBHOOK_SECRET_LEN {
            return Err(format!(
                "webhook secret must be at least {MIN_WEBHOOK_SECRET_LEN} bytes"
            ));
        }
    }
    Ok(())
}
