// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The admit/deny decision for a single request.
//!
//! ## Decision Order
//!
//! 1. Gate disabled → admit, no identity
//! 2. Bypass path → admit, no identity
//! 3. Service token headers present → must match the configured pair,
//!    otherwise deny. Never falls through to the assertion, so a second
//!    credential cannot rescue a bad service token.
//! 4. Assertion header → verify; any failure denies
//! 5. Nothing presented → deny
//!
//! Every path ends in exactly one [`AuthDecision`]; nothing is retried.

use axum::http::{HeaderMap, HeaderValue};
use subtle::ConstantTimeEq;

use super::bypass::is_bypassed;
use super::claims::VerifiedIdentity;
use super::credential::Credential;
use super::error::DenyReason;
use super::verifier::CredentialVerifier;
use crate::config::GateConfig;

/// Outcome of [`AuthorizationGate::authorize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// Let the request through; identity is `None` for disabled or bypassed
    /// admissions.
    Admit(Option<VerifiedIdentity>),
    Deny(DenyReason),
}

/// Orchestrates bypass matching, service tokens and assertion verification.
#[derive(Clone)]
pub struct AuthorizationGate {
    config: GateConfig,
    verifier: CredentialVerifier,
}

impl AuthorizationGate {
    pub fn new(config: GateConfig, verifier: CredentialVerifier) -> Self {
        Self { config, verifier }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn verifier(&self) -> &CredentialVerifier {
        &self.verifier
    }

    /// Decide whether the request at `path` with `headers` may proceed.
    pub async fn authorize(&self, path: &str, headers: &HeaderMap) -> AuthDecision {
        if !self.config.enabled {
            return AuthDecision::Admit(None);
        }

        if is_bypassed(path, &self.config.bypass) {
            tracing::debug!(target: "gate.auth", path = %path, "Bypass path, skipping authentication");
            return AuthDecision::Admit(None);
        }

        match Credential::from_headers(headers) {
            Some(Credential::ServiceToken {
                client_id,
                client_secret,
            }) => self.check_service_token(path, &client_id, &client_secret),
            Some(Credential::SignedAssertion { raw_token }) => {
                self.check_assertion(path, &raw_token).await
            }
            None => {
                tracing::warn!(target: "gate.auth", path = %path, "No access credentials supplied");
                AuthDecision::Deny(DenyReason::MissingCredentials)
            }
        }
    }

    fn check_service_token(
        &self,
        path: &str,
        client_id: &HeaderValue,
        client_secret: &HeaderValue,
    ) -> AuthDecision {
        let Some((expected_id, expected_secret)) = self.config.service_token.pair() else {
            tracing::warn!(
                target: "gate.auth",
                path = %path,
                "Service token presented but no service token is configured"
            );
            return AuthDecision::Deny(DenyReason::ServiceTokenInvalid);
        };

        // Both halves are always compared; timing does not reveal which failed.
        let id_ok = client_id.as_bytes().ct_eq(expected_id.as_bytes());
        let secret_ok = client_secret.as_bytes().ct_eq(expected_secret.as_bytes());

        if bool::from(id_ok & secret_ok) {
            tracing::debug!(target: "gate.auth", path = %path, client_id = %expected_id, "Service token accepted");
            AuthDecision::Admit(Some(VerifiedIdentity::service_token(expected_id)))
        } else {
            tracing::warn!(target: "gate.auth", path = %path, "Service token rejected");
            AuthDecision::Deny(DenyReason::ServiceTokenInvalid)
        }
    }

    async fn check_assertion(&self, path: &str, raw_token: &HeaderValue) -> AuthDecision {
        let Ok(token) = raw_token.to_str() else {
            tracing::warn!(target: "gate.auth", path = %path, "Assertion header is not valid ASCII");
            return AuthDecision::Deny(DenyReason::AssertionInvalid);
        };

        let issuer = self.config.issuer();
        let result = self
            .verifier
            .verify(token.trim(), issuer.as_ref(), self.config.audience.as_deref())
            .await;

        match result {
            Ok(identity) => {
                tracing::debug!(
                    target: "gate.auth",
                    path = %path,
                    principal = identity.principal().unwrap_or("-"),
                    "Assertion accepted"
                );
                AuthDecision::Admit(Some(identity))
            }
            Err(e) if e.is_configuration() => {
                tracing::error!(target: "gate.auth", path = %path, error = %e, "Assertion verification is misconfigured");
                AuthDecision::Deny(DenyReason::AssertionInvalid)
            }
            Err(e) => {
                tracing::warn!(
                    target: "gate.auth",
                    path = %path,
                    error = %e,
                    error_code = e.error_code(),
                    "Assertion rejected"
                );
                AuthDecision::Deny(DenyReason::AssertionInvalid)
            }
        }
    }
}
