// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;

use givehub_core::{resolve_db_path, ENV_GIVEHUB_LOG_JSON, ENV_GIVEHUB_ORG_NAME};
use givehub_model::{Amount, CommissionPolicy, DonationLimits};
use givehub_server::{
    build_router, validate_startup_config, ApiConfig, AppState, RateLimitConfig,
};
use givehub_store::Store;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

fn env_commission_policy() -> Result<CommissionPolicy, String> {
    match env::var("GIVEHUB_COMMISSION_POLICY") {
        Ok(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
            .map_err(|e| format!("GIVEHUB_COMMISSION_POLICY is not a valid policy: {e}")),
        _ => Ok(CommissionPolicy::default()),
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                warn!("unix signal handlers unavailable, falling back to ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool(ENV_GIVEHUB_LOG_JSON, true) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let bind_addr = env::var("GIVEHUB_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let db_path = resolve_db_path();
    let defaults = ApiConfig::default();
    let api_cfg = ApiConfig {
        max_body_bytes: env_usize("GIVEHUB_MAX_BODY_BYTES", defaults.max_body_bytes),
        public_write_rate_limit: RateLimitConfig {
            capacity: env_f64(
                "GIVEHUB_RATE_LIMIT_CAPACITY",
                defaults.public_write_rate_limit.capacity,
            ),
            refill_per_sec: env_f64(
                "GIVEHUB_RATE_LIMIT_REFILL_PER_SEC",
                defaults.public_write_rate_limit.refill_per_sec,
            ),
        },
        webhook_secret: env::var("GIVEHUB_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty()),
        organization: env::var(ENV_GIVEHUB_ORG_NAME).unwrap_or(defaults.organization),
        donation_limits: DonationLimits {
            min_amount: Amount::from_minor(env_u64(
                "GIVEHUB_MIN_DONATION",
                defaults.donation_limits.min_amount.minor(),
            )),
            max_amount: Amount::from_minor(env_u64(
                "GIVEHUB_MAX_DONATION",
                defaults.donation_limits.max_amount.minor(),
            )),
        },
        commission_policy: env_commission_policy()?,
        enable_audit_log: env_bool("GIVEHUB_ENABLE_AUDIT_LOG", false),
    };
    validate_startup_config(&api_cfg)?;
    if api_cfg.webhook_secret.is_none() {
        warn!("GIVEHUB_WEBHOOK_SECRET unset; payment webhook will answer 503");
    }

    let store = Store::open(&db_path)
        .map_err(|e| format!("open database {}: {e}", db_path.display()))?;
    let schema_version = store.schema_version().map_err(|e| e.to_string())?;
    info!(db = %db_path.display(), schema_version, "database ready");

    let state = AppState::new(store, api_cfg);
    let app = build_router(state.clone());

    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| format!("invalid bind addr {bind_addr}: {e}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("bind failed: {e}"))?;
    info!(addr = %addr, "givehub listening");

    let ready = state.ready.clone();
    let shutdown = async move {
        wait_for_shutdown_signal().await;
        ready.store(false, Ordering::Relaxed);
        info!("shutdown signal received, draining");
    };
    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    {
        error!("server failed: {e}");
        return Err(format!("server failed: {e}"));
    }
    Ok(())
}
