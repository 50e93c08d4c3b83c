// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod account;
pub mod phone;

pub use account::{Account, AccountStatus, RegistrationStep, Role};
