// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One-time password challenges: generation, delivery, verification.
//!
//! Challenges live in a keyed in-process store; all verification transitions
//! happen under the store's per-phone entry lock so "check and consume" is
//! atomic. Codes are stored as keyed hashes and compared in constant time;
//! the plaintext code leaves the process only through the delivery gateway.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::Config;
use crate::error::AppError;
use crate::models::phone;
use crate::services::delivery::{Channel, DeliveryService};

type HmacSha256 = Hmac<Sha256>;

/// Code length in decimal digits.
const OTP_CODE_LEN: u32 = 6;

/// A pending challenge for one phone number. At most one exists per phone;
/// a new send replaces it.
struct OtpChallenge {
    code_mac: [u8; 32],
    channel: Channel,
    expires_at: DateTime<Utc>,
    /// Zero means exhausted; the record is kept until sweep or the next send
    /// so verification reports the right failure kind.
    attempts_left: u32,
}

/// Receipt returned to the caller after a successful dispatch.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub channel: Channel,
    pub expires_in_secs: i64,
}

/// OTP challenge service.
#[derive(Clone)]
pub struct OtpService {
    store: Arc<DashMap<String, OtpChallenge>>,
    delivery: DeliveryService,
    rng: SystemRandom,
    hash_key: Arc<Vec<u8>>,
    ttl: Duration,
    max_attempts: u32,
}

impl OtpService {
    pub fn new(config: &Config, delivery: DeliveryService) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            delivery,
            rng: SystemRandom::new(),
            hash_key: Arc::new(config.otp_hash_key.clone()),
            ttl: Duration::seconds(config.otp_ttl_secs),
            max_attempts: config.otp_max_attempts,
        }
    }

    /// Generate a code, dispatch it, and install the live challenge for the
    /// phone. Any prior unconsumed challenge is invalidated by the
    /// replacement; if the gateway does not acknowledge, nothing is stored
    /// and the prior challenge (if any) stays live.
    pub async fn send_otp(&self, phone: &str, channel: Channel) -> Result<SendReceipt, AppError> {
        let phone = phone::normalize_e164(phone)?;
        let code = self.generate_code()?;

        self.delivery.dispatch(&phone, &code, channel).await?;

        let challenge = OtpChallenge {
            code_mac: self.code_mac(&phone, &code),
            channel,
            expires_at: Utc::now() + self.ttl,
            attempts_left: self.max_attempts,
        };
        self.store.insert(phone.clone(), challenge);

        tracing::info!(
            phone = %phone::redact(&phone),
            channel = channel.as_str(),
            "OTP dispatched"
        );

        Ok(SendReceipt {
            channel,
            expires_in_secs: self.ttl.num_seconds(),
        })
    }

    /// Verify a code against the live challenge for the phone.
    ///
    /// Success consumes the challenge; a repeat call with the same code fails
    /// with `NoActiveChallenge`. Wrong codes burn an attempt each, and an
    /// exhausted challenge keeps failing with `AttemptsExhausted` until a new
    /// send, even for the correct code.
    pub fn verify_otp(&self, phone: &str, code: &str) -> Result<(), AppError> {
        let phone = phone::normalize_e164(phone)?;
        let presented_mac = self.code_mac(&phone, code);

        match self.store.entry(phone.clone()) {
            Entry::Vacant(_) => Err(AppError::NoActiveChallenge),
            Entry::Occupied(mut entry) => {
                let challenge = entry.get();

                if Utc::now() > challenge.expires_at {
                    entry.remove();
                    return Err(AppError::OtpExpired);
                }

                if challenge.attempts_left == 0 {
                    return Err(AppError::AttemptsExhausted);
                }

                if bool::from(challenge.code_mac.ct_eq(&presented_mac)) {
                    let channel = challenge.channel;
                    entry.remove();
                    tracing::info!(
                        phone = %phone::redact(&phone),
                        channel = channel.as_str(),
                        "OTP verified"
                    );
                    return Ok(());
                }

                let challenge = entry.get_mut();
                challenge.attempts_left -= 1;
                tracing::info!(
                    phone = %phone::redact(&phone),
                    attempts_left = challenge.attempts_left,
                    "OTP mismatch"
                );
                Err(AppError::CodeMismatch)
            }
        }
    }

    /// Drop expired challenges. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.store.len();
        self.store.retain(|_, challenge| challenge.expires_at > now);
        before - self.store.len()
    }

    fn generate_code(&self) -> Result<String, AppError> {
        let mut bytes = [0u8; 4];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("system RNG failure")))?;
        let value = u32::from_be_bytes(bytes) % 10u32.pow(OTP_CODE_LEN);
        Ok(format!("{:0width$}", value, width = OTP_CODE_LEN as usize))
    }

    fn code_mac(&self, phone: &str, code: &str) -> [u8; 32] {
        let mut mac = HmacSha256::new_from_slice(&self.hash_key)
            .expect("HMAC accepts any key length");
        mac.update(phone.as_bytes());
        mac.update(b":");
        mac.update(code.as_bytes());
        mac.finalize().into_bytes().into()
    }
}
