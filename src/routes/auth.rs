// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication routes: OTP, social login, refresh, logout, me.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{bearer_token, AuthUser};
use crate::models::{Account, AccountStatus, RegistrationStep, Role};
use crate::services::delivery::Channel;
use crate::services::session::OtpTarget;
use crate::services::sso::SsoProvider;
use crate::AppState;

/// Public auth routes (no token required).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/otp/send", post(send_otp))
        .route("/auth/otp/verify", post(verify_otp))
        .route("/auth/social/{provider}", post(social_login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

/// Routes behind the bearer-token middleware (applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/me", get(get_me))
}

// ─── Request / Response Shapes ───────────────────────────────

/// Account snapshot returned to clients.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: String,
    pub phone_e164: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub is_verified: bool,
    pub profile_complete: bool,
    pub registration_step: Option<RegistrationStep>,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            phone_e164: account.phone_e164,
            email: account.email,
            display_name: account.display_name,
            role: account.role,
            status: account.status,
            is_verified: account.is_verified,
            profile_complete: account.profile_complete,
            registration_step: account.registration_step,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_channel")]
    pub channel: Channel,
}

fn default_channel() -> Channel {
    Channel::Sms
}

#[derive(Debug, Serialize)]
pub struct SendOtpResponse {
    pub sent: bool,
    pub channel: Channel,
    pub expires_in_sec: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    #[validate(length(min = 4, max = 8))]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: AccountResponse,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SocialLoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "provider token required"))]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "refresh token required"))]
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// `phone` wins when both target fields are present.
fn otp_target(phone: Option<String>, user_id: Option<String>) -> Result<OtpTarget> {
    match (phone, user_id) {
        (Some(phone), _) => Ok(OtpTarget::Phone(phone)),
        (None, Some(user_id)) => Ok(OtpTarget::AccountId(user_id)),
        (None, None) => Err(AppError::BadRequest(
            "phone or user_id required".to_string(),
        )),
    }
}

// ─── Handlers ────────────────────────────────────────────────

/// Dispatch a login code.
async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<Json<SendOtpResponse>> {
    let target = otp_target(payload.phone, payload.user_id)?;
    let receipt = state.sessions.send_otp(target, payload.channel).await?;

    Ok(Json(SendOtpResponse {
        sent: true,
        channel: receipt.channel,
        expires_in_sec: receipt.expires_in_secs,
    }))
}

/// Verify a login code; issues a token pair and creates the account on
/// first login.
async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<LoginResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let target = otp_target(payload.phone, payload.user_id)?;
    let outcome = state.sessions.login_with_otp(target, &payload.code).await?;

    Ok(Json(LoginResponse {
        access: outcome.tokens.access,
        refresh: outcome.tokens.refresh,
        user: outcome.account.into(),
    }))
}

/// Login via a third-party identity provider.
async fn social_login(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Json(payload): Json<SocialLoginRequest>,
) -> Result<Json<LoginResponse>> {
    let provider = SsoProvider::from_path(&provider)
        .ok_or_else(|| AppError::NotFound(format!("provider {}", provider)))?;

    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let outcome = state
        .sessions
        .login_with_sso(provider, &payload.token)
        .await?;

    Ok(Json(LoginResponse {
        access: outcome.tokens.access,
        refresh: outcome.tokens.refresh,
        user: outcome.account.into(),
    }))
}

/// Rotate a refresh token.
async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let pair = state.sessions.refresh(&payload.refresh).await?;

    Ok(Json(TokenResponse {
        access: pair.access,
        refresh: pair.refresh,
    }))
}

/// Best-effort logout. Always 200: the client tears down its local session
/// regardless of how revocation went.
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<LogoutRequest>, JsonRejection>,
) -> Json<LogoutResponse> {
    let access = bearer_token(&headers);
    let refresh = payload
        .map(|Json(body)| body.refresh)
        .unwrap_or_default();

    state
        .sessions
        .logout(access.as_deref(), refresh.as_deref())
        .await;

    Json(LogoutResponse { success: true })
}

/// Current account snapshot. The auth middleware has already verified the
/// token; this enforces account status on top.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AccountResponse>> {
    let account = state.sessions.load_gated(&user.account_id).await?;
    Ok(Json(account.into()))
}
