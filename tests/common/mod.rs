// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;
use yolda_auth::config::Config;
use yolda_auth::db::AccountStore;
use yolda_auth::routes::create_router;
use yolda_auth::services::{DeliveryService, NormalizedIdentity, SsoProvider, SsoService};
use yolda_auth::AppState;

/// Google test identity with no phone claim.
#[allow(dead_code)]
pub const GOOGLE_TOKEN: &str = "good-google-token";
/// Facebook test identity carrying the same phone as [`PHONE`].
#[allow(dead_code)]
pub const FACEBOOK_TOKEN: &str = "good-facebook-token";
#[allow(dead_code)]
pub const PHONE: &str = "+998901234567";

/// Create a test app with offline mock dependencies.
/// Returns the router, the shared state, and the mock delivery gateway
/// (for reading dispatched codes).
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, DeliveryService) {
    let config = Config::test_default();
    let db = AccountStore::new_mock();
    let delivery = DeliveryService::new_mock();

    let mut identities = HashMap::new();
    identities.insert(
        (SsoProvider::Google, GOOGLE_TOKEN.to_string()),
        NormalizedIdentity {
            provider: SsoProvider::Google,
            provider_id: "google-sub-1".to_string(),
            email: Some("driver@example.com".to_string()),
            phone: None,
            display_name: Some("Test Driver".to_string()),
        },
    );
    identities.insert(
        (SsoProvider::Facebook, FACEBOOK_TOKEN.to_string()),
        NormalizedIdentity {
            provider: SsoProvider::Facebook,
            provider_id: "fb-sub-1".to_string(),
            email: None,
            phone: Some(PHONE.to_string()),
            display_name: None,
        },
    );
    let sso = SsoService::new_static(identities);

    let state = Arc::new(AppState::build(config, db, delivery.clone(), sso));

    (create_router(state.clone()), state, delivery)
}

/// POST a JSON body and return (status, parsed body).
#[allow(dead_code)]
pub async fn post_json(
    router: &axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// GET with an optional bearer token; returns (status, parsed body).
#[allow(dead_code)]
pub async fn get_with_bearer(
    router: &axum::Router,
    uri: &str,
    bearer: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let response = router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Run the full OTP login flow and return (access, refresh, user json).
#[allow(dead_code)]
pub async fn login_via_otp(
    router: &axum::Router,
    delivery: &DeliveryService,
    phone: &str,
) -> (String, String, serde_json::Value) {
    let (status, _) = post_json(
        router,
        "/auth/otp/send",
        serde_json::json!({"phone": phone, "channel": "sms"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let code = delivery.last_code_for(phone).expect("code dispatched");

    let (status, body) = post_json(
        router,
        "/auth/otp/verify",
        serde_json::json!({"phone": phone, "code": code}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    (
        body["access"].as_str().unwrap().to_string(),
        body["refresh"].as_str().unwrap().to_string(),
        body["user"].clone(),
    )
}
