// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client session gate driven by real server responses.
//!
//! The gate itself is pure (unit-tested next to its module); these tests
//! feed it outcomes produced by the actual HTTP surface, the way the app
//! shell does on cold start and foreground.

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{create_test_app, get_with_bearer, login_via_otp, post_json, PHONE};
use yolda_auth::gate::{reduce, CheckOutcome, RoutingDecision, SessionEvent, SessionState};
use yolda_auth::models::Account;

/// What the app shell does with a `/auth/me` response.
fn outcome_from_response(status: StatusCode, body: &serde_json::Value) -> CheckOutcome {
    if status == StatusCode::OK {
        let account: Account = serde_json::from_value(body.clone()).unwrap();
        CheckOutcome::Confirmed(account)
    } else {
        CheckOutcome::from_http(status.as_u16(), body["error"].as_str().unwrap_or(""))
    }
}

#[tokio::test]
async fn test_cold_start_routes_new_driver_to_profile_completion() {
    let (router, _state, delivery) = create_test_app();
    let (access, _refresh, _user) = login_via_otp(&router, &delivery, PHONE).await;

    let (status, body) = get_with_bearer(&router, "/auth/me", Some(&access)).await;
    let state = reduce(
        SessionState::Unknown,
        SessionEvent::RestoreChecked {
            cached: None,
            outcome: outcome_from_response(status, &body),
        },
    );

    assert_eq!(state.routing(), RoutingDecision::ProfileCompletion);
}

#[tokio::test]
async fn test_foreground_check_catches_admin_block() {
    let (router, state, delivery) = create_test_app();
    let (access, _refresh, user) = login_via_otp(&router, &delivery, PHONE).await;

    let (status, body) = get_with_bearer(&router, "/auth/me", Some(&access)).await;
    let mut gate_state = reduce(
        SessionState::Unknown,
        SessionEvent::RestoreChecked {
            cached: None,
            outcome: outcome_from_response(status, &body),
        },
    );
    assert_eq!(gate_state.routing(), RoutingDecision::ProfileCompletion);

    // Admin blocks the account while the app is backgrounded
    let mut account = state
        .db
        .get_account(user["id"].as_str().unwrap())
        .await
        .unwrap()
        .unwrap();
    account.status = yolda_auth::models::AccountStatus::Blocked;
    state.db.upsert_account(&account).await.unwrap();

    let (status, body) = get_with_bearer(&router, "/auth/me", Some(&access)).await;
    gate_state = reduce(
        gate_state,
        SessionEvent::ForegroundChecked(outcome_from_response(status, &body)),
    );

    assert_eq!(gate_state.routing(), RoutingDecision::RestrictedScreen);
}

#[tokio::test]
async fn test_revoked_session_forces_auth_flow_and_clears() {
    let (router, _state, delivery) = create_test_app();
    let (access, refresh, _user) = login_via_otp(&router, &delivery, PHONE).await;

    // Something revoked the session server-side (e.g. logout elsewhere)
    let (status, _) = post_json(&router, "/auth/logout", json!({"refresh": refresh})).await;
    assert_eq!(status, StatusCode::OK);

    // Refresh fails authoritatively -> the client logs out cleanly
    let (status, body) = post_json(&router, "/auth/refresh", json!({"refresh": refresh})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let gate_state = reduce(
        SessionState::Unknown,
        SessionEvent::RestoreChecked {
            cached: None,
            outcome: CheckOutcome::from_http(
                status.as_u16(),
                body["error"].as_str().unwrap_or(""),
            ),
        },
    );
    assert_eq!(gate_state, SessionState::Unauthenticated);
    assert_eq!(gate_state.routing(), RoutingDecision::AuthFlow);

    // The paired access token this flow held is unaffected by the refresh
    // revocation; /auth/me still answers until it expires. The gate state
    // above is what clears it locally.
    let (status, _) = get_with_bearer(&router, "/auth/me", Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_offline_cold_start_uses_cached_snapshot() {
    let (router, _state, delivery) = create_test_app();
    let (_access, _refresh, user) = login_via_otp(&router, &delivery, PHONE).await;
    let cached: Account = serde_json::from_value(user).unwrap();

    // Network down: no server answer at all
    let state = reduce(
        SessionState::Unknown,
        SessionEvent::RestoreChecked {
            cached: Some(cached),
            outcome: CheckOutcome::Unreachable,
        },
    );

    // Stale-but-not-wrong: the driver still gets into the app offline
    assert_eq!(state.routing(), RoutingDecision::ProfileCompletion);
}
