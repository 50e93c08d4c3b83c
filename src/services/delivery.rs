// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Delivery gateway client for one-time codes (SMS / voice call / push).
//!
//! The gateway owns the actual carrier integration; this client only cares
//! about whether dispatch was acknowledged. A code counts as "sent" iff the
//! gateway returns 2xx.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

const GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Out-of-band channel for code delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Call,
    Push,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Call => "call",
            Channel::Push => "push",
        }
    }
}

/// Dispatch request body for the gateway.
#[derive(Debug, Serialize)]
struct DispatchRequest<'a> {
    to: &'a str,
    channel: &'a str,
    body: String,
}

/// A message captured by the mock gateway (tests only).
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub phone: String,
    pub code: String,
    pub channel: Channel,
}

#[derive(Clone)]
enum Mode {
    Live {
        client: reqwest::Client,
        base_url: String,
        token: String,
    },
    Mock {
        sent: Arc<Mutex<Vec<SentMessage>>>,
        fail_next: Arc<Mutex<bool>>,
    },
}

/// Client for the code delivery gateway.
#[derive(Clone)]
pub struct DeliveryService {
    mode: Mode,
}

impl DeliveryService {
    /// Create a live gateway client.
    pub fn new(base_url: &str, token: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(GATEWAY_TIMEOUT)
            .build()
            .expect("failed building delivery HTTP client");

        Self {
            mode: Mode::Live {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                token: token.to_string(),
            },
        }
    }

    /// Create an in-memory gateway that records messages instead of sending.
    pub fn new_mock() -> Self {
        Self {
            mode: Mode::Mock {
                sent: Arc::new(Mutex::new(Vec::new())),
                fail_next: Arc::new(Mutex::new(false)),
            },
        }
    }

    /// Dispatch a code. Returns only once the gateway acknowledged (or the
    /// mock recorded it); any other outcome is an error and the caller must
    /// not treat the code as sent.
    pub async fn dispatch(
        &self,
        phone: &str,
        code: &str,
        channel: Channel,
    ) -> Result<(), AppError> {
        match &self.mode {
            Mode::Live {
                client,
                base_url,
                token,
            } => {
                let request = DispatchRequest {
                    to: phone,
                    channel: channel.as_str(),
                    body: format!("Yolda: your login code is {}", code),
                };

                let response = client
                    .post(format!("{}/messages", base_url))
                    .bearer_auth(token)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| {
                        if e.is_timeout() {
                            AppError::Timeout("delivery gateway".to_string())
                        } else {
                            AppError::DeliveryFailed(e.to_string())
                        }
                    })?;

                if !response.status().is_success() {
                    return Err(AppError::DeliveryFailed(format!(
                        "gateway returned status {}",
                        response.status()
                    )));
                }

                Ok(())
            }
            Mode::Mock { sent, fail_next } => {
                let mut fail = fail_next.lock().unwrap();
                if *fail {
                    *fail = false;
                    return Err(AppError::DeliveryFailed("mock gateway failure".to_string()));
                }
                drop(fail);

                sent.lock().unwrap().push(SentMessage {
                    phone: phone.to_string(),
                    code: code.to_string(),
                    channel,
                });
                Ok(())
            }
        }
    }

    /// Messages recorded by the mock gateway. Empty in live mode.
    pub fn sent_messages(&self) -> Vec<SentMessage> {
        match &self.mode {
            Mode::Live { .. } => Vec::new(),
            Mode::Mock { sent, .. } => sent.lock().unwrap().clone(),
        }
    }

    /// Most recent code dispatched to a phone (mock only).
    pub fn last_code_for(&self, phone: &str) -> Option<String> {
        self.sent_messages()
            .iter()
            .rev()
            .find(|m| m.phone == phone)
            .map(|m| m.code.clone())
    }

    /// Make the next mock dispatch fail (mock only, no-op in live mode).
    pub fn set_mock_fail_next(&self) {
        if let Mode::Mock { fail_next, .. } = &self.mode {
            *fail_next.lock().unwrap() = true;
        }
    }
}
