// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the identity attached by the gate middleware.
//!
//! ```rust,ignore
//! async fn my_handler(OptionalAuth(identity): OptionalAuth) -> impl IntoResponse {
//!     // identity is Option<VerifiedIdentity>
//! }
//! ```

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::VerifiedIdentity;

/// Optional identity extractor.
///
/// Returns `None` for disabled or bypassed admissions instead of rejecting.
pub struct OptionalAuth(pub Option<VerifiedIdentity>);

impl<S: Send + Sync> FromRequestParts<S> for OptionalAuth {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(parts.extensions.get::<VerifiedIdentity>().cloned()))
    }
}
