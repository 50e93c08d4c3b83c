// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OTP login flow tests.
//!
//! These exercise the full HTTP surface: dispatch via the mock gateway,
//! challenge replacement on resend, single-use consumption, attempt
//! exhaustion, and the error codes clients branch on.

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{create_test_app, login_via_otp, post_json, PHONE};

#[tokio::test]
async fn test_send_otp_dispatches_code() {
    let (router, _state, delivery) = create_test_app();

    let (status, body) = post_json(
        &router,
        "/auth/otp/send",
        json!({"phone": PHONE, "channel": "sms"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sent"], true);
    assert_eq!(body["channel"], "sms");
    assert_eq!(body["expires_in_sec"], 300);

    let sent = delivery.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].phone, PHONE);
    assert_eq!(sent[0].code.len(), 6);
}

#[tokio::test]
async fn test_send_otp_requires_target() {
    let (router, _state, _delivery) = create_test_app();

    let (status, body) = post_json(&router, "/auth/otp/send", json!({"channel": "sms"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_send_otp_rejects_malformed_phone() {
    let (router, _state, _delivery) = create_test_app();

    let (status, body) = post_json(
        &router,
        "/auth/otp/send",
        json!({"phone": "998901234567", "channel": "sms"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_phone");
}

#[tokio::test]
async fn test_send_otp_unknown_account_is_404() {
    let (router, _state, _delivery) = create_test_app();

    let (status, body) = post_json(
        &router,
        "/auth/otp/send",
        json!({"user_id": "no-such-account"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_verify_creates_verified_account() {
    let (router, _state, delivery) = create_test_app();

    let (_access, _refresh, user) = login_via_otp(&router, &delivery, PHONE).await;

    assert_eq!(user["phone_e164"], PHONE);
    assert_eq!(user["is_verified"], true);
    assert_eq!(user["role"], "driver");
    assert_eq!(user["profile_complete"], false);
    assert_eq!(user["registration_step"], "personal_info");
}

#[tokio::test]
async fn test_wrong_code_then_right_code() {
    let (router, _state, delivery) = create_test_app();

    post_json(
        &router,
        "/auth/otp/send",
        json!({"phone": PHONE, "channel": "sms"}),
    )
    .await;
    let code = delivery.last_code_for(PHONE).unwrap();
    let wrong: String = code
        .chars()
        .map(|c| if c == '9' { '0' } else { char::from(c as u8 + 1) })
        .collect();

    let (status, body) = post_json(
        &router,
        "/auth/otp/verify",
        json!({"phone": PHONE, "code": wrong}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "code_mismatch");

    let (status, body) = post_json(
        &router,
        "/auth/otp/verify",
        json!({"phone": PHONE, "code": code}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access"].is_string());
    assert!(body["refresh"].is_string());
}

#[tokio::test]
async fn test_code_is_single_use() {
    let (router, _state, delivery) = create_test_app();

    post_json(
        &router,
        "/auth/otp/send",
        json!({"phone": PHONE, "channel": "sms"}),
    )
    .await;
    let code = delivery.last_code_for(PHONE).unwrap();

    let (status, _) = post_json(
        &router,
        "/auth/otp/verify",
        json!({"phone": PHONE, "code": code}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Replay after success must fail: the challenge was consumed
    let (status, body) = post_json(
        &router,
        "/auth/otp/verify",
        json!({"phone": PHONE, "code": code}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no_active_challenge");
}

#[tokio::test]
async fn test_resend_invalidates_previous_challenge() {
    let (router, _state, delivery) = create_test_app();

    post_json(
        &router,
        "/auth/otp/send",
        json!({"phone": PHONE, "channel": "sms"}),
    )
    .await;
    let first = delivery.last_code_for(PHONE).unwrap();

    post_json(
        &router,
        "/auth/otp/send",
        json!({"phone": PHONE, "channel": "sms"}),
    )
    .await;
    let second = delivery.last_code_for(PHONE).unwrap();

    if first != second {
        let (status, body) = post_json(
            &router,
            "/auth/otp/verify",
            json!({"phone": PHONE, "code": first}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "code_mismatch");
    }

    let (status, _) = post_json(
        &router,
        "/auth/otp/verify",
        json!({"phone": PHONE, "code": second}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_attempts_exhausted_even_for_right_code() {
    let (router, _state, delivery) = create_test_app();

    post_json(
        &router,
        "/auth/otp/send",
        json!({"phone": PHONE, "channel": "sms"}),
    )
    .await;
    let code = delivery.last_code_for(PHONE).unwrap();
    let wrong: String = code
        .chars()
        .map(|c| if c == '9' { '0' } else { char::from(c as u8 + 1) })
        .collect();

    // test config allows 3 attempts
    for _ in 0..3 {
        let (status, body) = post_json(
            &router,
            "/auth/otp/verify",
            json!({"phone": PHONE, "code": wrong}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "code_mismatch");
    }

    let (status, body) = post_json(
        &router,
        "/auth/otp/verify",
        json!({"phone": PHONE, "code": code}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "attempts_exhausted");

    // A new send resets the challenge
    post_json(
        &router,
        "/auth/otp/send",
        json!({"phone": PHONE, "channel": "sms"}),
    )
    .await;
    let fresh = delivery.last_code_for(PHONE).unwrap();
    let (status, _) = post_json(
        &router,
        "/auth/otp/verify",
        json!({"phone": PHONE, "code": fresh}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_gateway_failure_surfaces_as_delivery_failed() {
    let (router, _state, delivery) = create_test_app();
    delivery.set_mock_fail_next();

    let (status, body) = post_json(
        &router,
        "/auth/otp/send",
        json!({"phone": PHONE, "channel": "sms"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "delivery_failed");

    // No challenge was persisted
    let (status, body) = post_json(
        &router,
        "/auth/otp/verify",
        json!({"phone": PHONE, "code": "123456"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no_active_challenge");
}

#[tokio::test]
async fn test_verify_without_active_challenge() {
    let (router, _state, _delivery) = create_test_app();

    let (status, body) = post_json(
        &router,
        "/auth/otp/verify",
        json!({"phone": PHONE, "code": "123456"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no_active_challenge");
}

#[tokio::test]
async fn test_send_by_account_id_uses_stored_phone() {
    let (router, _state, delivery) = create_test_app();

    let (_access, _refresh, user) = login_via_otp(&router, &delivery, PHONE).await;
    let user_id = user["id"].as_str().unwrap();

    let (status, body) = post_json(
        &router,
        "/auth/otp/send",
        json!({"user_id": user_id, "channel": "call"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["channel"], "call");

    let sent = delivery.sent_messages();
    assert_eq!(sent.last().unwrap().phone, PHONE);
}
