// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Third-party identity verification (Google / Apple / Facebook).
//!
//! Each provider token is checked against that provider's verification
//! surface and reduced to a `NormalizedIdentity`; the rest of the crate
//! never sees provider-specific claims. Apple id_tokens are verified
//! locally against Apple's JWKS; Google and Facebook tokens go to their
//! respective verification endpoints.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::config::Config;
use crate::error::AppError;

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const FACEBOOK_ME_URL: &str = "https://graph.facebook.com/v19.0/me";
const APPLE_JWKS_URL: &str = "https://appleid.apple.com/auth/keys";
const APPLE_ISSUER: &str = "https://appleid.apple.com";
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Supported identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SsoProvider {
    Google,
    Apple,
    Facebook,
}

impl SsoProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            SsoProvider::Google => "google",
            SsoProvider::Apple => "apple",
            SsoProvider::Facebook => "facebook",
        }
    }

    /// Parse the provider segment of `/auth/social/{provider}`.
    pub fn from_path(segment: &str) -> Option<Self> {
        match segment {
            "google" => Some(SsoProvider::Google),
            "apple" => Some(SsoProvider::Apple),
            "facebook" => Some(SsoProvider::Facebook),
            _ => None,
        }
    }
}

/// Provider-agnostic identity claim.
#[derive(Debug, Clone)]
pub struct NormalizedIdentity {
    pub provider: SsoProvider,
    pub provider_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Clone)]
enum VerifierMode {
    Live {
        client: reqwest::Client,
        google_audience: String,
        apple_audience: String,
    },
    /// Pre-seeded token -> identity map for deterministic tests.
    Static {
        identities: Arc<HashMap<(SsoProvider, String), NormalizedIdentity>>,
    },
}

/// Verifier for third-party login tokens.
#[derive(Clone)]
pub struct SsoService {
    mode: VerifierMode,
}

impl SsoService {
    /// Create a production verifier.
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .expect("failed building SSO HTTP client");

        Self {
            mode: VerifierMode::Live {
                client,
                google_audience: config.google_client_id.clone(),
                apple_audience: config.apple_client_id.clone(),
            },
        }
    }

    /// Create a verifier that resolves only pre-seeded tokens.
    pub fn new_static(
        identities: HashMap<(SsoProvider, String), NormalizedIdentity>,
    ) -> Self {
        Self {
            mode: VerifierMode::Static {
                identities: Arc::new(identities),
            },
        }
    }

    /// Verify a provider token and return the normalized identity.
    /// Idempotent within the provider token's validity window.
    pub async fn authenticate(
        &self,
        provider: SsoProvider,
        provider_token: &str,
    ) -> Result<NormalizedIdentity, AppError> {
        match &self.mode {
            VerifierMode::Static { identities } => identities
                .get(&(provider, provider_token.to_string()))
                .cloned()
                .ok_or_else(|| {
                    AppError::InvalidProviderToken(format!(
                        "unknown {} token",
                        provider.as_str()
                    ))
                }),
            VerifierMode::Live {
                client,
                google_audience,
                apple_audience,
            } => match provider {
                SsoProvider::Google => {
                    verify_google(client, google_audience, provider_token).await
                }
                SsoProvider::Apple => verify_apple(client, apple_audience, provider_token).await,
                SsoProvider::Facebook => verify_facebook(client, provider_token).await,
            },
        }
    }
}

// ─── Google ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GoogleTokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
    email_verified: Option<String>,
    name: Option<String>,
}

async fn verify_google(
    client: &reqwest::Client,
    expected_audience: &str,
    id_token: &str,
) -> Result<NormalizedIdentity, AppError> {
    let response = client
        .get(GOOGLE_TOKENINFO_URL)
        .query(&[("id_token", id_token)])
        .send()
        .await
        .map_err(|e| map_transport_error("google", e))?;

    if response.status().is_client_error() {
        return Err(AppError::InvalidProviderToken(
            "google rejected the id_token".to_string(),
        ));
    }
    if !response.status().is_success() {
        return Err(AppError::ProviderUnreachable(format!(
            "google tokeninfo returned status {}",
            response.status()
        )));
    }

    let info: GoogleTokenInfo = response
        .json()
        .await
        .map_err(|e| AppError::ProviderUnreachable(format!("invalid tokeninfo JSON: {e}")))?;

    if info.aud != expected_audience {
        return Err(AppError::InvalidProviderToken(
            "google id_token audience mismatch".to_string(),
        ));
    }

    if info.email.is_some() && info.email_verified.as_deref() != Some("true") {
        return Err(AppError::InvalidProviderToken(
            "google email not verified".to_string(),
        ));
    }

    Ok(NormalizedIdentity {
        provider: SsoProvider::Google,
        provider_id: info.sub,
        email: info.email,
        phone: None,
        display_name: info.name,
    })
}

// ─── Facebook ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FacebookProfile {
    id: String,
    name: Option<String>,
    email: Option<String>,
}

async fn verify_facebook(
    client: &reqwest::Client,
    access_token: &str,
) -> Result<NormalizedIdentity, AppError> {
    let response = client
        .get(FACEBOOK_ME_URL)
        .query(&[("fields", "id,name,email"), ("access_token", access_token)])
        .send()
        .await
        .map_err(|e| map_transport_error("facebook", e))?;

    if response.status().is_client_error() {
        return Err(AppError::InvalidProviderToken(
            "facebook rejected the access token".to_string(),
        ));
    }
    if !response.status().is_success() {
        return Err(AppError::ProviderUnreachable(format!(
            "facebook graph returned status {}",
            response.status()
        )));
    }

    let profile: FacebookProfile = response
        .json()
        .await
        .map_err(|e| AppError::ProviderUnreachable(format!("invalid graph JSON: {e}")))?;

    Ok(NormalizedIdentity {
        provider: SsoProvider::Facebook,
        provider_id: profile.id,
        email: profile.email,
        phone: None,
        display_name: profile.name,
    })
}

// ─── Apple ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AppleJwks {
    keys: Vec<AppleJwk>,
}

#[derive(Debug, Deserialize)]
struct AppleJwk {
    kid: String,
    kty: String,
    n: String,
    e: String,
}

/// Apple sends `email_verified` as either a bool or the string "true".
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AppleEmailVerified {
    Bool(bool),
    Text(String),
}

impl AppleEmailVerified {
    fn is_verified(&self) -> bool {
        match self {
            AppleEmailVerified::Bool(b) => *b,
            AppleEmailVerified::Text(s) => s == "true",
        }
    }
}

#[derive(Debug, Deserialize)]
struct AppleIdTokenClaims {
    sub: String,
    email: Option<String>,
    email_verified: Option<AppleEmailVerified>,
}

async fn verify_apple(
    client: &reqwest::Client,
    expected_audience: &str,
    id_token: &str,
) -> Result<NormalizedIdentity, AppError> {
    let header = decode_header(id_token)
        .map_err(|e| AppError::InvalidProviderToken(format!("invalid JWT header: {e}")))?;

    if header.alg != Algorithm::RS256 {
        return Err(AppError::InvalidProviderToken(format!(
            "unexpected JWT alg: {:?}",
            header.alg
        )));
    }

    let kid = header
        .kid
        .ok_or_else(|| AppError::InvalidProviderToken("missing JWT kid".to_string()))?;

    let response = client
        .get(APPLE_JWKS_URL)
        .send()
        .await
        .map_err(|e| map_transport_error("apple", e))?;

    if !response.status().is_success() {
        return Err(AppError::ProviderUnreachable(format!(
            "apple JWKS returned status {}",
            response.status()
        )));
    }

    let jwks: AppleJwks = response
        .json()
        .await
        .map_err(|e| AppError::ProviderUnreachable(format!("invalid JWKS JSON: {e}")))?;

    let jwk = jwks
        .keys
        .iter()
        .find(|k| k.kid == kid && k.kty == "RSA")
        .ok_or_else(|| {
            AppError::InvalidProviderToken(format!("JWT kid not found in apple JWKS: {kid}"))
        })?;

    let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
        .map_err(|e| AppError::ProviderUnreachable(format!("bad apple JWKS key: {e}")))?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[APPLE_ISSUER]);
    validation.set_audience(&[expected_audience]);

    let claims = decode::<AppleIdTokenClaims>(id_token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| AppError::InvalidProviderToken(format!("JWT validation failed: {e}")))?;

    let email = match (&claims.email, &claims.email_verified) {
        (Some(email), Some(v)) if v.is_verified() => Some(email.clone()),
        _ => None,
    };

    Ok(NormalizedIdentity {
        provider: SsoProvider::Apple,
        provider_id: claims.sub,
        email,
        phone: None,
        display_name: None,
    })
}

fn map_transport_error(provider: &str, e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(format!("{provider} verification"))
    } else {
        AppError::ProviderUnreachable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_verifier() -> SsoService {
        let mut identities = HashMap::new();
        identities.insert(
            (SsoProvider::Google, "good-token".to_string()),
            NormalizedIdentity {
                provider: SsoProvider::Google,
                provider_id: "google-123".to_string(),
                email: Some("driver@example.com".to_string()),
                phone: None,
                display_name: Some("Test Driver".to_string()),
            },
        );
        SsoService::new_static(identities)
    }

    #[tokio::test]
    async fn test_static_verifier_resolves_seeded_token() {
        let sso = seeded_verifier();
        let identity = sso
            .authenticate(SsoProvider::Google, "good-token")
            .await
            .unwrap();
        assert_eq!(identity.provider_id, "google-123");
        assert_eq!(identity.email.as_deref(), Some("driver@example.com"));
        assert!(identity.phone.is_none());
    }

    #[tokio::test]
    async fn test_static_verifier_rejects_unknown_token() {
        let sso = seeded_verifier();
        let err = sso
            .authenticate(SsoProvider::Google, "bad-token")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidProviderToken(_)));

        // Same token under a different provider is a different key
        let err = sso
            .authenticate(SsoProvider::Facebook, "good-token")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidProviderToken(_)));
    }

    #[test]
    fn test_provider_from_path() {
        assert_eq!(SsoProvider::from_path("google"), Some(SsoProvider::Google));
        assert_eq!(SsoProvider::from_path("apple"), Some(SsoProvider::Apple));
        assert_eq!(SsoProvider::from_path("vk"), None);
    }

    #[test]
    fn test_apple_email_verified_both_shapes() {
        let v: AppleEmailVerified = serde_json::from_str("true").unwrap();
        assert!(v.is_verified());
        let v: AppleEmailVerified = serde_json::from_str("\"true\"").unwrap();
        assert!(v.is_verified());
        let v: AppleEmailVerified = serde_json::from_str("\"false\"").unwrap();
        assert!(!v.is_verified());
    }
}
