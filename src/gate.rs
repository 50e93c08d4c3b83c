// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client session gate: the state machine that routes a restored session
//! into the auth flow, the profile-completion flow, or the main app.
//!
//! The gate is a pure reducer plus a reconcile policy; the mobile shell
//! feeds it events (cold-start restore, login, foreground re-check,
//! logout) and renders whatever `routing()` says. It makes no
//! authorization decisions - the server re-validates every protected
//! operation regardless of what the client shows.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{Account, AccountStatus};

/// Why a session is pinned to the restricted screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictedReason {
    Blocked,
    PendingDeletion,
}

/// Session routing state. `Restricted` is terminal for the lifecycle:
/// the only exit is logout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// Persisted session not yet checked.
    Unknown,
    Unauthenticated,
    AuthenticatedIncomplete { account: Account },
    AuthenticatedComplete { account: Account },
    Restricted { reason: RestrictedReason },
}

/// Outcome of asking the server for the current account.
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    /// Fresh authoritative snapshot.
    Confirmed(Account),
    /// The credential itself was rejected; the session is dead.
    Rejected,
    StatusBlocked,
    StatusPendingDeletion,
    /// Transport-level failure; the server said nothing about the session.
    Unreachable,
}

impl CheckOutcome {
    /// Classify a failed `current_account` call.
    pub fn from_error(error: &AppError) -> Self {
        match error {
            AppError::AccountBlocked => CheckOutcome::StatusBlocked,
            AppError::AccountPendingDeletion => CheckOutcome::StatusPendingDeletion,
            AppError::Unauthorized
            | AppError::InvalidToken
            | AppError::TokenExpired
            | AppError::TokenRevoked => CheckOutcome::Rejected,
            _ => CheckOutcome::Unreachable,
        }
    }

    /// Classify a failed `/auth/me` HTTP response by status and the stable
    /// `error` code from the body. This is what the app shell calls; only
    /// 401/403 are authoritative about the session, everything else is
    /// treated as transport noise.
    pub fn from_http(status: u16, error_code: &str) -> Self {
        match (status, error_code) {
            (403, "account_blocked") => CheckOutcome::StatusBlocked,
            (403, "account_pending_deletion") => CheckOutcome::StatusPendingDeletion,
            (401, _) => CheckOutcome::Rejected,
            _ => CheckOutcome::Unreachable,
        }
    }
}

/// Events fed to the reducer by the app shell.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Cold start: the persisted snapshot (if any) plus the server check.
    RestoreChecked {
        cached: Option<Account>,
        outcome: CheckOutcome,
    },
    LoginSucceeded(Account),
    /// App returned to foreground; re-validation result.
    ForegroundChecked(CheckOutcome),
    LogoutRequested,
}

/// Which UI flow to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    Splash,
    AuthFlow,
    ProfileCompletion,
    Main,
    RestrictedScreen,
}

impl SessionState {
    pub fn routing(&self) -> RoutingDecision {
        match self {
            SessionState::Unknown => RoutingDecision::Splash,
            SessionState::Unauthenticated => RoutingDecision::AuthFlow,
            SessionState::AuthenticatedIncomplete { .. } => RoutingDecision::ProfileCompletion,
            SessionState::AuthenticatedComplete { .. } => RoutingDecision::Main,
            SessionState::Restricted { .. } => RoutingDecision::RestrictedScreen,
        }
    }

    fn account(&self) -> Option<&Account> {
        match self {
            SessionState::AuthenticatedIncomplete { account }
            | SessionState::AuthenticatedComplete { account } => Some(account),
            _ => None,
        }
    }
}

/// Derive the state an account snapshot belongs in.
fn from_account(account: Account) -> SessionState {
    match account.status {
        AccountStatus::Blocked => SessionState::Restricted {
            reason: RestrictedReason::Blocked,
        },
        AccountStatus::PendingDelete => SessionState::Restricted {
            reason: RestrictedReason::PendingDeletion,
        },
        AccountStatus::Active => {
            if account.profile_complete {
                SessionState::AuthenticatedComplete { account }
            } else {
                SessionState::AuthenticatedIncomplete { account }
            }
        }
    }
}

/// Reconcile a local snapshot with the server's answer.
///
/// Server-confirmed data always wins. A transport failure keeps the
/// last-known local snapshot (stale-but-not-wrong, usable offline); an
/// authoritative rejection of the credential forces re-login.
pub fn reconcile(local: Option<&Account>, outcome: &CheckOutcome) -> SessionState {
    match outcome {
        CheckOutcome::Confirmed(account) => from_account(account.clone()),
        CheckOutcome::StatusBlocked => SessionState::Restricted {
            reason: RestrictedReason::Blocked,
        },
        CheckOutcome::StatusPendingDeletion => SessionState::Restricted {
            reason: RestrictedReason::PendingDeletion,
        },
        CheckOutcome::Rejected => SessionState::Unauthenticated,
        CheckOutcome::Unreachable => match local {
            Some(account) => from_account(account.clone()),
            None => SessionState::Unauthenticated,
        },
    }
}

/// Pure transition function.
pub fn reduce(state: SessionState, event: SessionEvent) -> SessionState {
    match event {
        SessionEvent::LogoutRequested => SessionState::Unauthenticated,
        SessionEvent::LoginSucceeded(account) => from_account(account),
        SessionEvent::RestoreChecked { cached, outcome } => {
            reconcile(cached.as_ref(), &outcome)
        }
        SessionEvent::ForegroundChecked(outcome) => match &state {
            // Restricted is terminal until logout; nothing to re-derive.
            SessionState::Restricted { .. } => state,
            SessionState::Unknown | SessionState::Unauthenticated => state,
            SessionState::AuthenticatedIncomplete { .. }
            | SessionState::AuthenticatedComplete { .. } => {
                reconcile(state.account(), &outcome)
            }
        },
    }
}
