// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Find-or-create resolution from a verified login channel to an account.
//!
//! One account per phone / provider identity. Concurrent identical logins
//! are serialized per key: the loser of a creation race re-reads inside the
//! lock and attaches to the winner's account.

use std::sync::Arc;

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::AccountStore;
use crate::error::AppError;
use crate::models::{phone, Account, AccountStatus, RegistrationStep, Role};
use crate::services::sso::NormalizedIdentity;

/// A proof of identity produced by OTP verification or SSO.
#[derive(Debug, Clone)]
pub enum VerifiedChannel {
    /// Phone ownership proven via OTP; value is normalized E.164.
    Phone(String),
    Sso(NormalizedIdentity),
}

/// Per-key creation locks shared across resolver clones.
type CreationLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Resolves verified identities to accounts.
#[derive(Clone)]
pub struct IdentityResolver {
    db: AccountStore,
    creation_locks: CreationLocks,
    default_role: Role,
}

impl IdentityResolver {
    pub fn new(db: AccountStore, default_role: Role) -> Self {
        Self {
            db,
            creation_locks: Arc::new(DashMap::new()),
            default_role,
        }
    }

    /// Find the account owning this identity, creating it on first login.
    ///
    /// New accounts start verified (the channel just proved possession),
    /// active, and with an incomplete profile. Existing unverified accounts
    /// are upgraded to verified.
    pub async fn resolve_or_create(
        &self,
        channel: VerifiedChannel,
    ) -> Result<Account, AppError> {
        let (primary_key, secondary_key) = identity_keys(&channel)?;

        let lock = self
            .creation_locks
            .entry(primary_key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Re-read under the lock; a concurrent racer may have created the
        // account while we waited.
        if let Some(mut account) = self.db.find_account_by_identity(&primary_key).await? {
            if !account.is_verified {
                account.is_verified = true;
                self.db.upsert_account(&account).await?;
            }
            if let Some(key) = &secondary_key {
                self.db.link_identity(key, &account.id).await?;
            }
            return Ok(account);
        }

        let account = self.new_account(&channel);
        self.db.upsert_account(&account).await?;
        self.db.link_identity(&primary_key, &account.id).await?;
        if let Some(key) = &secondary_key {
            self.db.link_identity(key, &account.id).await?;
        }

        tracing::info!(
            account_id = %account.id,
            role = ?account.role,
            "Account created on first login"
        );
        Ok(account)
    }

    fn new_account(&self, channel: &VerifiedChannel) -> Account {
        let (phone_e164, email, display_name) = match channel {
            VerifiedChannel::Phone(phone) => (Some(phone.clone()), None, None),
            VerifiedChannel::Sso(identity) => (
                identity.phone.clone(),
                identity.email.clone(),
                identity.display_name.clone(),
            ),
        };

        let registration_step = match self.default_role {
            Role::Driver => Some(RegistrationStep::PersonalInfo),
            _ => None,
        };

        Account {
            id: Uuid::new_v4().to_string(),
            phone_e164,
            email,
            display_name,
            role: self.default_role,
            status: AccountStatus::Active,
            is_verified: true,
            profile_complete: false,
            registration_step,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Unique lookup keys for a channel. The phone key wins as primary when a
/// provider claim carries a phone, so SSO and OTP logins for the same
/// person land on one account.
fn identity_keys(
    channel: &VerifiedChannel,
) -> Result<(String, Option<String>), AppError> {
    match channel {
        VerifiedChannel::Phone(phone) => Ok((phone_key(phone), None)),
        VerifiedChannel::Sso(identity) => {
            let sso = sso_key(identity);
            match &identity.phone {
                Some(raw) => {
                    let normalized = phone::normalize_e164(raw)?;
                    Ok((phone_key(&normalized), Some(sso)))
                }
                None => Ok((sso, None)),
            }
        }
    }
}

fn phone_key(phone_e164: &str) -> String {
    let digest = Sha256::digest(phone_e164.as_bytes());
    format!("phone:{}", hex::encode(digest))
}

fn sso_key(identity: &NormalizedIdentity) -> String {
    format!("sso:{}:{}", identity.provider.as_str(), identity.provider_id)
}
