//! Application configuration loaded from environment variables.
//!
//! Secrets (signing keys, gateway tokens) are read once at startup and kept
//! in memory; on Cloud Run they arrive as env vars via secret bindings.

use std::env;

use crate::models::Role;

/// Default access token lifetime: 1 hour.
const DEFAULT_ACCESS_TTL_SECS: i64 = 60 * 60;
/// Default refresh token lifetime: 30 days.
const DEFAULT_REFRESH_TTL_SECS: i64 = 30 * 24 * 60 * 60;
/// Default OTP challenge lifetime: 5 minutes.
const DEFAULT_OTP_TTL_SECS: i64 = 5 * 60;
/// Default number of wrong codes tolerated before the challenge dies.
const DEFAULT_OTP_MAX_ATTEMPTS: u32 = 5;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Mobile/web app origin allowed by CORS
    pub app_origin: String,
    /// GCP project ID (account persistence)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Role assigned to accounts created on first login
    pub default_role: Role,
    /// Issuer claim stamped into every token
    pub jwt_issuer: String,
    /// Access token lifetime in seconds
    pub access_ttl_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: i64,
    /// OTP challenge lifetime in seconds
    pub otp_ttl_secs: i64,
    /// Wrong-code attempts allowed per challenge
    pub otp_max_attempts: u32,
    /// SMS/voice gateway base URL
    pub sms_gateway_url: String,
    /// Expected `aud` for Google ID tokens
    pub google_client_id: String,
    /// Expected `aud` for Apple ID tokens
    pub apple_client_id: String,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Key for hashing OTP codes at rest (raw bytes)
    pub otp_hash_key: Vec<u8>,
    /// Bearer token for the SMS/voice gateway
    pub sms_gateway_token: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            app_origin: env::var("APP_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            default_role: Role::Driver,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "yolda-auth".to_string()),
            access_ttl_secs: parse_i64_env("ACCESS_TTL_SECS", DEFAULT_ACCESS_TTL_SECS),
            refresh_ttl_secs: parse_i64_env("REFRESH_TTL_SECS", DEFAULT_REFRESH_TTL_SECS),
            otp_ttl_secs: parse_i64_env("OTP_TTL_SECS", DEFAULT_OTP_TTL_SECS),
            otp_max_attempts: env::var("OTP_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_OTP_MAX_ATTEMPTS),
            sms_gateway_url: env::var("SMS_GATEWAY_URL")
                .map_err(|_| ConfigError::Missing("SMS_GATEWAY_URL"))?,
            google_client_id: env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            apple_client_id: env::var("APPLE_CLIENT_ID").unwrap_or_default(),

            // Secrets - from env for local dev, secret bindings in prod
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            otp_hash_key: env::var("OTP_HASH_KEY")
                .map_err(|_| ConfigError::Missing("OTP_HASH_KEY"))?
                .into_bytes(),
            sms_gateway_token: env::var("SMS_GATEWAY_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SMS_GATEWAY_TOKEN"))?,
        })
    }

    /// Fixed config for tests. Short OTP TTL keeps expiry tests fast.
    pub fn test_default() -> Self {
        Self {
            app_origin: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            default_role: Role::Driver,
            jwt_issuer: "yolda-auth-test".to_string(),
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
            otp_ttl_secs: DEFAULT_OTP_TTL_SECS,
            otp_max_attempts: 3,
            sms_gateway_url: "http://localhost:9090".to_string(),
            google_client_id: "test-google-client".to_string(),
            apple_client_id: "test.apple.client".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            otp_hash_key: b"test_otp_hash_key".to_vec(),
            sms_gateway_token: "test_gateway_token".to_string(),
        }
    }
}

fn parse_i64_env(name: &str, default: i64) -> i64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
