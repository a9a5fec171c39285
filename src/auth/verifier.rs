// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed assertion verification against the issuer's key set.

use jsonwebtoken::{decode, decode_header, Validation};

use super::claims::{AccessClaims, VerifiedIdentity};
use super::error::AuthError;
use super::jwks::{Issuer, KeySetCache};
use crate::config::{EXPECTED_AUDIENCE_ENV, ISSUER_TEAM_DOMAIN_ENV};

/// Clock skew tolerance. Expiry and not-before are enforced exactly.
const CLOCK_SKEW_LEEWAY: u64 = 0;

/// Verifies Access assertions.
///
/// Checks, all-or-nothing: signature by the key named in the header `kid`,
/// issuer, audience, expiry and (when present) not-before.
#[derive(Clone)]
pub struct CredentialVerifier {
    keys: KeySetCache,
}

impl CredentialVerifier {
    pub fn new(keys: KeySetCache) -> Self {
        Self { keys }
    }

    pub fn key_cache(&self) -> &KeySetCache {
        &self.keys
    }

    /// Verify `token` for the configured issuer and audience.
    ///
    /// Missing settings are a configuration error, never an admission.
    pub async fn verify(
        &self,
        token: &str,
        issuer: Option<&Issuer>,
        audience: Option<&str>,
    ) -> Result<VerifiedIdentity, AuthError> {
        let issuer = issuer.ok_or(AuthError::Configuration(ISSUER_TEAM_DOMAIN_ENV))?;
        let audience = audience.ok_or(AuthError::Configuration(EXPECTED_AUDIENCE_ENV))?;

        self.verify_for_issuer(token, issuer, audience).await
    }

    /// Verify `token` against an explicit issuer.
    pub async fn verify_for_issuer(
        &self,
        token: &str,
        issuer: &Issuer,
        audience: &str,
    ) -> Result<VerifiedIdentity, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
        let kid = header.kid.as_deref().ok_or(AuthError::MissingKeyId)?;

        let key_set = self.keys.get_key_set(issuer).await?;
        let (decoding_key, algorithm) = key_set.decoding_key(kid)?;

        let mut validation = Validation::new(algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        // `exp` must be strictly after now; a token expiring this second is expired.
        validation.reject_tokens_expiring_in_less_than = 1;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.set_issuer(&[issuer.issuer()]);
        validation.set_audience(&[audience]);

        let token_data = decode::<AccessClaims>(token, &decoding_key, &validation)?;

        Ok(VerifiedIdentity::from_claims(token_data.claims))
    }
}
