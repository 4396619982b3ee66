// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! HTTP service for givehub: router, shared state, request tracing,
//! bearer-token auth, rate limiting and the endpoint handlers.

use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::{Arc, Mutex};

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use givehub_api::ApiError;
use givehub_store::{Store, StoreError};
use tracing::error;

mod config;
mod http;
mod middleware;
mod rate_limiter;

pub use config::{
    validate_startup_config, ApiConfig, RateLimitConfig, CONFIG_SCHEMA_VERSION,
    MAX_BODY_BYTES_CEILING,
};

pub use http::webhook::{sign_webhook_body, SIGNATURE_HEADER};

use middleware::request_tracing::request_tracing_middleware;
use middleware::security::security_middleware;
use rate_limiter::RateLimiter;

pub const CRATE_NAME: &str = "givehub-server";

#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<Store>>,
    pub api: Arc<ApiConfig>,
    pub ready: Arc<AtomicBool>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
    pub(crate) write_limiter: Arc<RateLimiter>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Store, api: ApiConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            api: Arc::new(api),
            ready: Arc::new(AtomicBool::new(true)),
            request_id_seed: Arc::new(AtomicU64::new(1)),
            write_limiter: Arc::new(RateLimiter::default()),
        }
    }

    /// Runs `work` against the store on the blocking pool.
    ///
    /// Domain rejections become their API error; anything else is logged
    /// and reported as an internal error.
    pub(crate) async fn with_store<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Store) -> Result<T, StoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let joined = tokio::task::spawn_blocking(move || {
            let mut guard = store
                .lock()
                .map_err(|_| StoreError::Corrupt("store mutex poisoned".to_string()))?;
            work(&mut *guard)
        })
        .await;
        match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                if err.domain().is_none() {
                    error!(error = %err, "store operation failed");
                }
                Err(ApiError::from_store(&err))
            }
            Err(err) => {
                error!(error = %err, "store task aborted");
                Err(ApiError::internal())
            }
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(http::health::healthz_handler))
        .route("/readyz", get(http::health::readyz_handler))
        .route("/v1/version", get(http::health::version_handler))
        .route(
            "/v1/donations",
            post(http::donations::create_donation_handler)
                .get(http::donations::list_donations_handler),
        )
        .route("/v1/donations/:id", get(http::donations::get_donation_handler))
        .route(
            "/v1/donations/:id/complete",
            post(http::donations::complete_donation_handler),
        )
        .route(
            "/v1/donations/:id/fail",
            post(http::donations::fail_donation_handler),
        )
        .route(
            "/v1/donations/:id/refund",
            post(http::donations::refund_donation_handler),
        )
        .route(
            "/v1/donations/:id/certificate",
            get(http::certificates::donation_certificate_handler),
        )
        .route(
            "/v1/certificates/:number/verify",
            get(http::certificates::verify_certificate_handler),
        )
        .route("/v1/highlights", get(http::donations::highlights_handler))
        .route(
            "/v1/referrals/:code",
            get(http::users::resolve_referral_handler),
        )
        .route(
            "/v1/payments/webhook",
            post(http::webhook::payment_webhook_handler),
        )
        .route("/v1/users", post(http::users::create_user_handler))
        .route("/v1/users/me", get(http::users::me_handler))
        .route("/v1/users/:id", get(http::users::get_user_handler))
        .route(
            "/v1/users/:id/subordinates",
            get(http::users::subordinates_handler),
        )
        .route(
            "/v1/users/:id/deactivate",
            post(http::users::deactivate_user_handler),
        )
        .route(
            "/v1/users/:id/parent",
            post(http::users::reassign_parent_handler),
        )
        .route(
            "/v1/users/:id/token",
            post(http::users::rotate_token_handler),
        )
        .route(
            "/v1/commissions",
            get(http::commissions::list_commissions_handler),
        )
        .route(
            "/v1/commissions/summary",
            get(http::commissions::commission_summary_handler),
        )
        .route(
            "/v1/commissions/payouts",
            post(http::commissions::record_payout_handler),
        )
        .route(
            "/v1/commissions/:id/status",
            post(http::commissions::update_commission_status_handler),
        )
        .route(
            "/v1/targets",
            post(http::targets::assign_target_handler).get(http::targets::list_targets_handler),
        )
        .route("/v1/targets/:id", get(http::targets::get_target_handler))
        .route(
            "/v1/targets/:id/divide",
            post(http::targets::divide_target_handler),
        )
        .route(
            "/v1/targets/:id/progress",
            get(http::targets::target_progress_handler),
        )
        .route("/v1/surveys", post(http::surveys::create_form_handler))
        .route("/v1/surveys/:slug", get(http::surveys::get_form_handler))
        .route(
            "/v1/surveys/:slug/status",
            post(http::surveys::set_form_status_handler),
        )
        .route(
            "/v1/surveys/:slug/submissions",
            post(http::surveys::submit_survey_handler)
                .get(http::surveys::list_submissions_handler),
        )
        .route(
            "/v1/dashboard/admin",
            get(http::dashboards::admin_dashboard_handler),
        )
        .route(
            "/v1/dashboard/me",
            get(http::dashboards::member_dashboard_handler),
        )
        .layer(from_fn_with_state(state.clone(), security_middleware))
        .layer(from_fn_with_state(state.clone(), request_tracing_middleware))
        .layer(DefaultBodyLimit::max(state.api.max_body_bytes))
        .with_state(state)
}
