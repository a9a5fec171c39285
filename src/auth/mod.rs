// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! This module decides whether a request may reach the protected application.
//!
//! ## Auth Flow
//!
//! 1. The edge forwarder (or Cloudflare Access itself) sends the request with
//!    either a service token pair (`Cf-Access-Client-Id` /
//!    `Cf-Access-Client-Secret`) or a signed assertion
//!    (`Cf-Access-Jwt-Assertion`)
//! 2. The gate middleware:
//!    - Admits everything when disabled, and bypass paths unconditionally
//!    - Compares service tokens against the configured pair
//!    - Otherwise fetches the team's JWKS and verifies the assertion's
//!      signature, issuer, audience, expiry and not-before
//! 3. Admitted requests carry a [`VerifiedIdentity`] in their extensions
//!
//! ## Security
//!
//! - Fail-closed: missing configuration, unreachable keys and malformed
//!   tokens all deny
//! - Service token headers commit the request to that check
//! - JWKS is cached for one hour and never served stale

pub mod bypass;
pub mod claims;
pub mod credential;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod jwks;
pub mod middleware;
pub mod verifier;

pub use bypass::{is_bypassed, BypassRule};
pub use claims::{AccessClaims, VerifiedIdentity};
pub use credential::{Credential, ASSERTION_HEADER, CLIENT_ID_HEADER, CLIENT_SECRET_HEADER};
pub use error::{AuthError, DenyReason};
pub use extractor::OptionalAuth;
pub use gate::{AuthDecision, AuthorizationGate};
pub use jwks::{Clock, Issuer, KeySet, KeySetCache, SystemClock};
pub use middleware::access_gate;
pub use verifier::CredentialVerifier;
