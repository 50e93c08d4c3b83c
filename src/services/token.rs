// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access/refresh token pairs: issuance, verification, rotation, revocation.
//!
//! Both tokens are HS256 JWTs carrying a unique identifier (`jti`). Revoking
//! marks the identifier in a keyed in-process set; rotation consumes the
//! refresh token's identifier with an insert-if-vacant that exactly one of
//! two concurrent rotations can win. Revocation entries expire with the
//! token they refer to, so the set stays bounded.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Account, Role};

/// Which half of a pair a token is. Embedded in claims so a refresh token
/// can never pass as an access token or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims - data stored in the token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (account id)
    pub sub: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
    pub iss: String,
    /// Unique token identifier
    pub jti: String,
    pub kind: TokenKind,
}

/// An issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
    pub access_expires_in: i64,
}

/// Set of revoked token identifiers, each held until the underlying token
/// would have expired anyway.
#[derive(Default)]
pub struct RevocationStore {
    entries: DashMap<String, DateTime<Utc>>,
}

impl RevocationStore {
    pub fn is_revoked(&self, jti: &str) -> bool {
        self.entries.contains_key(jti)
    }

    /// Mark an identifier revoked iff it was not already. Returns whether
    /// this call was the one that revoked it - the winner of a rotation
    /// race sees `true`, everyone else `false`.
    pub fn revoke_once(&self, jti: &str, keep_until: DateTime<Utc>) -> bool {
        match self.entries.entry(jti.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(keep_until);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Mark an identifier revoked regardless of prior state (logout path).
    pub fn revoke(&self, jti: &str, keep_until: DateTime<Utc>) {
        self.entries.insert(jti.to_string(), keep_until);
    }

    /// Drop entries whose token has expired on its own. Returns how many
    /// were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, keep_until| *keep_until > now);
        before - self.entries.len()
    }
}

/// Token service - creates, verifies, rotates and revokes token pairs.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    revocations: Arc<RevocationStore>,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(&config.jwt_signing_key),
            decoding_key: DecodingKey::from_secret(&config.jwt_signing_key),
            issuer: config.jwt_issuer.clone(),
            access_ttl: Duration::seconds(config.access_ttl_secs),
            refresh_ttl: Duration::seconds(config.refresh_ttl_secs),
            revocations: Arc::new(RevocationStore::default()),
        }
    }

    /// Issue a fresh pair for an account. Each half gets its own `jti`.
    pub fn issue(&self, account: &Account) -> Result<TokenPair, AppError> {
        let now = Utc::now();

        let access = self.encode_token(account, now, TokenKind::Access)?;
        let refresh = self.encode_token(account, now, TokenKind::Refresh)?;

        Ok(TokenPair {
            access,
            refresh,
            access_expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Verify an access token. Read-only and side-effect-free.
    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        let claims = self.decode_token(token, true)?;
        if claims.kind != TokenKind::Access {
            return Err(AppError::InvalidToken);
        }
        if self.revocations.is_revoked(&claims.jti) {
            return Err(AppError::TokenRevoked);
        }
        Ok(claims)
    }

    /// Validate a refresh token and consume its identifier.
    ///
    /// Of two concurrent calls with the same token, exactly one returns the
    /// claims; the other observes the winner's revocation and fails. The
    /// caller is expected to issue the replacement pair from a fresh account
    /// read so role changes take effect at rotation.
    pub fn consume_refresh(&self, token: &str) -> Result<Claims, AppError> {
        let claims = self.decode_token(token, true)?;
        if claims.kind != TokenKind::Refresh {
            return Err(AppError::InvalidToken);
        }

        let keep_until = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or_else(|| Utc::now() + self.refresh_ttl);

        if !self.revocations.revoke_once(&claims.jti, keep_until) {
            return Err(AppError::TokenRevoked);
        }

        Ok(claims)
    }

    /// Revoke a token of either kind. Tolerates already-expired input (a
    /// no-op: the token cannot be used anyway).
    pub fn revoke(&self, token: &str) -> Result<(), AppError> {
        let claims = self.decode_token(token, false)?;

        let keep_until = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or_else(Utc::now);

        if keep_until > Utc::now() {
            self.revocations.revoke(&claims.jti, keep_until);
        }
        Ok(())
    }

    /// Drop revocation entries for tokens that have expired on their own.
    pub fn purge_expired(&self) -> usize {
        self.revocations.purge_expired()
    }

    fn encode_token(
        &self,
        account: &Account,
        now: DateTime<Utc>,
        kind: TokenKind,
    ) -> Result<String, AppError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            sub: account.id.clone(),
            role: account.role,
            phone: account.phone_e164.clone(),
            email: account.email.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
            kind,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT encoding failed: {}", e)))
    }

    fn decode_token(&self, token: &str, validate_exp: bool) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = validate_exp;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken,
            })
    }
}
