// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Yolda Auth API Server
//!
//! Identity & session lifecycle backend for the Yolda driver app: OTP and
//! SSO login, token rotation and revocation, account status gating.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yolda_auth::{
    config::Config,
    db::AccountStore,
    services::{DeliveryService, SsoService},
    AppState,
};

/// How often expired OTP challenges and revocation entries are purged.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Yolda Auth API");

    // Initialize account storage
    let db = AccountStore::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Delivery gateway + SSO verifiers
    let delivery = DeliveryService::new(&config.sms_gateway_url, &config.sms_gateway_token);
    let sso = SsoService::new(&config);
    tracing::info!(gateway = %config.sms_gateway_url, "Delivery gateway initialized");

    // Build shared state
    let state = Arc::new(AppState::build(config.clone(), db, delivery, sso));

    // Periodic cleanup of expired challenges and revocation entries
    spawn_sweeper(state.clone());

    // Build router
    let app = yolda_auth::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Purge expired OTP challenges and revocation entries on an interval so
/// neither store grows unboundedly.
fn spawn_sweeper(state: Arc<yolda_auth::AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let challenges = state.otp.sweep_expired();
            let revocations = state.tokens.purge_expired();
            if challenges > 0 || revocations > 0 {
                tracing::debug!(challenges, revocations, "Swept expired entries");
            }
        }
    });
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("yolda_auth=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
