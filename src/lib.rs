// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Yolda Auth: identity & session lifecycle service for the Yolda driver app
//!
//! This crate provides OTP and SSO login, token pair issuance/rotation/
//! revocation, account resolution, and the client-side session gate that
//! routes a restored session into the right app flow.

pub mod config;
pub mod db;
pub mod error;
pub mod gate;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::AccountStore;
use services::{
    DeliveryService, IdentityResolver, OtpService, SessionService, SsoService, TokenService,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: AccountStore,
    pub tokens: TokenService,
    pub otp: OtpService,
    pub sessions: SessionService,
}

impl AppState {
    /// Wire the service graph from its leaf collaborators.
    pub fn build(
        config: Config,
        db: AccountStore,
        delivery: DeliveryService,
        sso: SsoService,
    ) -> Self {
        let tokens = TokenService::new(&config);
        let otp = OtpService::new(&config, delivery);
        let identity = IdentityResolver::new(db.clone(), config.default_role);
        let sessions = SessionService::new(
            db.clone(),
            otp.clone(),
            sso,
            identity,
            tokens.clone(),
        );

        Self {
            config,
            db,
            tokens,
            otp,
            sessions,
        }
    }
}
