// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Social login tests against the seeded static verifier.

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{create_test_app, login_via_otp, post_json, FACEBOOK_TOKEN, GOOGLE_TOKEN, PHONE};

#[tokio::test]
async fn test_google_login_creates_account_without_phone() {
    let (router, _state, _delivery) = create_test_app();

    let (status, body) = post_json(
        &router,
        "/auth/social/google",
        json!({"token": GOOGLE_TOKEN}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["access"].is_string());
    assert!(body["refresh"].is_string());
    assert_eq!(body["user"]["phone_e164"], serde_json::Value::Null);
    assert_eq!(body["user"]["email"], "driver@example.com");
    assert_eq!(body["user"]["is_verified"], true);
}

#[tokio::test]
async fn test_repeat_google_login_reuses_account() {
    let (router, _state, _delivery) = create_test_app();

    let (_, first) = post_json(
        &router,
        "/auth/social/google",
        json!({"token": GOOGLE_TOKEN}),
    )
    .await;
    let (_, second) = post_json(
        &router,
        "/auth/social/google",
        json!({"token": GOOGLE_TOKEN}),
    )
    .await;

    assert_eq!(first["user"]["id"], second["user"]["id"]);
}

#[tokio::test]
async fn test_sso_with_phone_claim_attaches_to_otp_account() {
    let (router, _state, delivery) = create_test_app();

    // Account created via OTP first; Facebook identity carries the same phone
    let (_access, _refresh, otp_user) = login_via_otp(&router, &delivery, PHONE).await;

    let (status, body) = post_json(
        &router,
        "/auth/social/facebook",
        json!({"token": FACEBOOK_TOKEN}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], otp_user["id"]);
}

#[tokio::test]
async fn test_invalid_provider_token_is_401() {
    let (router, _state, _delivery) = create_test_app();

    let (status, body) = post_json(
        &router,
        "/auth/social/google",
        json!({"token": "forged-token"}),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_provider_token");
}

#[tokio::test]
async fn test_missing_provider_token_is_400() {
    let (router, _state, _delivery) = create_test_app();

    let (status, body) = post_json(&router, "/auth/social/google", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_unknown_provider_is_404() {
    let (router, _state, _delivery) = create_test_app();

    let (status, body) = post_json(&router, "/auth/social/vk", json!({"token": "x"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}
