// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role attached to an account. Determines which app surface the client
/// routes to and is embedded in issued tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Driver,
    Dispatcher,
}

/// Lifecycle status. `PendingDelete` is a soft marker; accounts are never
/// hard-deleted synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Blocked,
    PendingDelete,
}

/// Driver registration wizard progress marker. The auth core only carries
/// this for routing; wizard field contents live elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStep {
    PersonalInfo,
    Passport,
    License,
    Vehicle,
    TaxiLicense,
    Done,
}

/// Account record persisted in the accounts collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Opaque stable id (also the document ID)
    pub id: String,
    /// Phone in E.164 form; unique across accounts when present
    pub phone_e164: Option<String>,
    /// Email address (from SSO claims, may be absent)
    pub email: Option<String>,
    /// Display name (from SSO claims)
    pub display_name: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    /// Set on first successful OTP verification or SSO login
    pub is_verified: bool,
    /// All required driver-registration steps submitted
    pub profile_complete: bool,
    pub registration_step: Option<RegistrationStep>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Whether the account may use the main app surface at all.
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}
