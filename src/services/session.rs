// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session orchestration: the public entry point for login, refresh,
//! logout and current-account lookup.
//!
//! Composes the OTP, SSO, identity and token services. Failures surface
//! with their originating kind; nothing here collapses a `CodeMismatch`
//! into a generic auth error, because clients render different guidance
//! for "wrong code" vs "expired code" vs "no active challenge".

use crate::db::AccountStore;
use crate::error::AppError;
use crate::models::{phone, Account, AccountStatus};
use crate::services::delivery::Channel;
use crate::services::identity::{IdentityResolver, VerifiedChannel};
use crate::services::otp::{OtpService, SendReceipt};
use crate::services::sso::{SsoProvider, SsoService};
use crate::services::token::{TokenPair, TokenService};

/// Who an OTP operation is aimed at: a raw phone, or an existing account
/// whose phone we look up.
#[derive(Debug, Clone)]
pub enum OtpTarget {
    Phone(String),
    AccountId(String),
}

/// Result of a successful login: the resolved account plus a fresh pair.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub account: Account,
    pub tokens: TokenPair,
}

/// Coordinates the login/session lifecycle services.
#[derive(Clone)]
pub struct SessionService {
    db: AccountStore,
    otp: OtpService,
    sso: SsoService,
    identity: IdentityResolver,
    tokens: TokenService,
}

impl SessionService {
    pub fn new(
        db: AccountStore,
        otp: OtpService,
        sso: SsoService,
        identity: IdentityResolver,
        tokens: TokenService,
    ) -> Self {
        Self {
            db,
            otp,
            sso,
            identity,
            tokens,
        }
    }

    /// Dispatch a login code to the target phone.
    pub async fn send_otp(
        &self,
        target: OtpTarget,
        channel: Channel,
    ) -> Result<SendReceipt, AppError> {
        let phone = self.resolve_phone(&target).await?;
        self.otp.send_otp(&phone, channel).await
    }

    /// Verify the code, resolve the account, and issue a token pair.
    pub async fn login_with_otp(
        &self,
        target: OtpTarget,
        code: &str,
    ) -> Result<LoginOutcome, AppError> {
        let phone = self.resolve_phone(&target).await?;
        self.otp.verify_otp(&phone, code)?;

        let account = self
            .identity
            .resolve_or_create(VerifiedChannel::Phone(phone))
            .await?;
        let tokens = self.tokens.issue(&account)?;

        tracing::info!(account_id = %account.id, "Login via OTP");
        Ok(LoginOutcome { account, tokens })
    }

    /// Verify a provider token, resolve the account, and issue a pair.
    pub async fn login_with_sso(
        &self,
        provider: SsoProvider,
        provider_token: &str,
    ) -> Result<LoginOutcome, AppError> {
        let identity = self.sso.authenticate(provider, provider_token).await?;

        let account = self
            .identity
            .resolve_or_create(VerifiedChannel::Sso(identity))
            .await?;
        let tokens = self.tokens.issue(&account)?;

        tracing::info!(
            account_id = %account.id,
            provider = provider.as_str(),
            "Login via SSO"
        );
        Ok(LoginOutcome { account, tokens })
    }

    /// Rotate a refresh token into a fresh pair.
    ///
    /// The old identifier is consumed first (exactly one concurrent caller
    /// can win), then claims are rebuilt from a fresh account read so a
    /// role change becomes visible at the next rotation.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let claims = self.tokens.consume_refresh(refresh_token)?;

        let account = self
            .db
            .get_account(&claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        self.tokens.issue(&account)
    }

    /// Best-effort revocation of whichever tokens the client still holds.
    ///
    /// Never fails outward: the client clears its local session regardless,
    /// so a revoke hiccup must not block logout.
    pub async fn logout(&self, access_token: Option<&str>, refresh_token: Option<&str>) {
        for token in [access_token, refresh_token].into_iter().flatten() {
            if let Err(e) = self.tokens.revoke(token) {
                tracing::debug!(error = %e, "Ignoring revoke failure during logout");
            }
        }
    }

    /// Verify an access token and load its account, enforcing status.
    ///
    /// Blocked and pending-deletion accounts fail with their own kinds so
    /// callers can route to the restricted screen instead of a login form.
    pub async fn current_account(&self, access_token: &str) -> Result<Account, AppError> {
        let claims = self.tokens.verify_access(access_token)?;
        self.load_gated(&claims.sub).await
    }

    /// Load an already-authenticated account, enforcing status. Used by
    /// handlers behind the auth middleware, which has verified the token.
    pub async fn load_gated(&self, account_id: &str) -> Result<Account, AppError> {
        let account = self
            .db
            .get_account(account_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        match account.status {
            AccountStatus::Blocked => Err(AppError::AccountBlocked),
            AccountStatus::PendingDelete => Err(AppError::AccountPendingDeletion),
            AccountStatus::Active => Ok(account),
        }
    }

    async fn resolve_phone(&self, target: &OtpTarget) -> Result<String, AppError> {
        match target {
            OtpTarget::Phone(raw) => phone::normalize_e164(raw),
            OtpTarget::AccountId(id) => {
                let account = self
                    .db
                    .get_account(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Account {}", id)))?;
                account
                    .phone_e164
                    .ok_or_else(|| AppError::BadRequest("account has no phone".to_string()))
            }
        }
    }
}
