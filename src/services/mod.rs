// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod delivery;
pub mod identity;
pub mod otp;
pub mod session;
pub mod sso;
pub mod token;

pub use delivery::{Channel, DeliveryService};
pub use identity::{IdentityResolver, VerifiedChannel};
pub use otp::OtpService;
pub use session::{LoginOutcome, OtpTarget, SessionService};
pub use sso::{NormalizedIdentity, SsoProvider, SsoService};
pub use token::{Claims, TokenPair, TokenService};
