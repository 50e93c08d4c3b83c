// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Accounts (profile + status storage)
//! - Identity links (unique phone / provider-subject keys -> account id)
//!
//! The store runs in one of two modes: a real Firestore connection (with
//! emulator support for local development) or an in-memory backend used by
//! tests and offline development. Handlers cannot tell the difference.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::db::collections;
use crate::error::AppError;
use crate::models::Account;

/// Identity link document: maps a unique login key to its account.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IdentityLink {
    account_id: String,
}

#[derive(Default)]
struct MemoryBackend {
    accounts: DashMap<String, Account>,
    identities: DashMap<String, String>,
}

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<MemoryBackend>),
}

/// Account store over Firestore or an in-memory backend.
#[derive(Clone)]
pub struct AccountStore {
    backend: Backend,
}

impl AccountStore {
    /// Create a new Firestore-backed store.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create an in-memory store for testing (offline mode).
    pub fn new_mock() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryBackend::default())),
        }
    }

    // ─── Account Operations ──────────────────────────────────────

    /// Get an account by its ID.
    pub async fn get_account(&self, account_id: &str) -> Result<Option<Account>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::ACCOUNTS)
                .obj()
                .one(account_id)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(mem) => Ok(mem.accounts.get(account_id).map(|a| a.value().clone())),
        }
    }

    /// Create or update an account.
    pub async fn upsert_account(&self, account: &Account) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::ACCOUNTS)
                    .document_id(&account.id)
                    .object(account)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            Backend::Memory(mem) => {
                mem.accounts.insert(account.id.clone(), account.clone());
                Ok(())
            }
        }
    }

    // ─── Identity Link Operations ────────────────────────────────

    /// Look up the account id owning a login key (phone hash or provider
    /// subject).
    pub async fn find_account_id(&self, identity_key: &str) -> Result<Option<String>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let link: Option<IdentityLink> = client
                    .fluent()
                    .select()
                    .by_id_in(collections::IDENTITIES)
                    .obj()
                    .one(identity_key)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(link.map(|l| l.account_id))
            }
            Backend::Memory(mem) => Ok(mem
                .identities
                .get(identity_key)
                .map(|entry| entry.value().clone())),
        }
    }

    /// Point a login key at an account. The key IS the document id, so two
    /// writers for the same key collapse onto one document instead of
    /// creating duplicates.
    pub async fn link_identity(
        &self,
        identity_key: &str,
        account_id: &str,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let link = IdentityLink {
                    account_id: account_id.to_string(),
                };
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::IDENTITIES)
                    .document_id(identity_key)
                    .object(&link)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            Backend::Memory(mem) => {
                mem.identities
                    .insert(identity_key.to_string(), account_id.to_string());
                Ok(())
            }
        }
    }

    /// Resolve a login key straight to its account.
    pub async fn find_account_by_identity(
        &self,
        identity_key: &str,
    ) -> Result<Option<Account>, AppError> {
        match self.find_account_id(identity_key).await? {
            Some(account_id) => self.get_account(&account_id).await,
            None => Ok(None),
        }
    }
}
