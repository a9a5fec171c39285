// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors and the uniform denial response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure while resolving or verifying a signed assertion.
///
/// None of these messages are sent to clients; they are logged next to the
/// denial and collapsed into [`DenyReason::AssertionInvalid`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// A setting required for assertion verification is absent
    #[error("{0} is not configured")]
    Configuration(&'static str),
    /// JWKS endpoint unreachable, non-2xx, or malformed body
    #[error("Failed to fetch JWKS: {0}")]
    JwksFetchError(String),
    /// Token is not a decodable JWT
    #[error("Token is malformed")]
    MalformedToken,
    /// Token header carries no `kid`
    #[error("Token header has no key id")]
    MissingKeyId,
    /// `kid` not present in the current key set
    #[error("No matching key found in JWKS")]
    NoMatchingKey,
    /// Key in the set cannot be turned into a verification key
    #[error("Unsupported key in JWKS: {0}")]
    UnsupportedKey(String),
    /// Token signed with an algorithm the selected key does not allow
    #[error("Token algorithm does not match the signing key")]
    AlgorithmMismatch,
    #[error("Token signature is invalid")]
    InvalidSignature,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Token is not yet valid")]
    TokenNotYetValid,
    #[error("Token issuer is invalid")]
    InvalidIssuer,
    #[error("Token audience is invalid")]
    InvalidAudience,
    /// A required claim (`exp`, `iss`, `aud`) is missing
    #[error("Token is missing required claim '{0}'")]
    MissingClaim(String),
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Configuration(_) => "configuration_error",
            AuthError::JwksFetchError(_) => "jwks_fetch_error",
            AuthError::MalformedToken => "malformed_token",
            AuthError::MissingKeyId => "missing_key_id",
            AuthError::NoMatchingKey => "no_matching_key",
            AuthError::UnsupportedKey(_) => "unsupported_key",
            AuthError::AlgorithmMismatch => "algorithm_mismatch",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::MissingClaim(_) => "missing_claim",
        }
    }

    /// Misconfiguration rather than a bad token.
    pub fn is_configuration(&self) -> bool {
        matches!(self, AuthError::Configuration(_))
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
            ErrorKind::InvalidAudience => AuthError::InvalidAudience,
            ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            ErrorKind::InvalidAlgorithm => AuthError::AlgorithmMismatch,
            ErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.clone()),
            _ => AuthError::MalformedToken,
        }
    }
}

/// Why the gate refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Neither service-token headers nor an assertion header were supplied
    MissingCredentials,
    /// Service-token headers were supplied but did not match
    ServiceTokenInvalid,
    /// The signed assertion failed verification (or could not be verified)
    AssertionInvalid,
}

impl DenyReason {
    pub fn error_code(&self) -> &'static str {
        match self {
            DenyReason::MissingCredentials => "missing_credentials",
            DenyReason::ServiceTokenInvalid => "service_token_invalid",
            DenyReason::AssertionInvalid => "assertion_invalid",
        }
    }

    /// Operator-facing detail. Clients must not depend on the wording.
    pub fn detail(&self) -> &'static str {
        match self {
            DenyReason::MissingCredentials => "No access credentials were supplied",
            DenyReason::ServiceTokenInvalid => "Invalid service token",
            DenyReason::AssertionInvalid => "Invalid or expired access token",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.error_code())
    }
}

#[derive(Serialize)]
struct DenialBody {
    success: bool,
    error: &'static str,
    detail: &'static str,
}

impl IntoResponse for DenyReason {
    fn into_response(self) -> Response {
        let body = Json(DenialBody {
            success: false,
            error: "Access denied",
            detail: self.detail(),
        });
        (StatusCode::FORBIDDEN, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(reason: DenyReason) -> (StatusCode, serde_json::Value) {
        let response = reason.into_response();
        let status = response.status();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body_bytes).unwrap())
    }

    #[tokio::test]
    async fn denial_is_403_with_uniform_body() {
        let (status, body) = body_json(DenyReason::MissingCredentials).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Access denied");
        assert!(body["detail"].as_str().unwrap().contains("No access credentials"));
    }

    #[test]
    fn details_are_distinct() {
        let details = [
            DenyReason::MissingCredentials.detail(),
            DenyReason::ServiceTokenInvalid.detail(),
            DenyReason::AssertionInvalid.detail(),
        ];
        assert_ne!(details[0], details[1]);
        assert_ne!(details[1], details[2]);
        assert_ne!(details[0], details[2]);
    }

    #[test]
    fn jsonwebtoken_errors_map_to_auth_errors() {
        use jsonwebtoken::errors::{Error, ErrorKind};

        let expired: AuthError = Error::from(ErrorKind::ExpiredSignature).into();
        assert!(matches!(expired, AuthError::TokenExpired));

        let aud: AuthError = Error::from(ErrorKind::InvalidAudience).into();
        assert!(matches!(aud, AuthError::InvalidAudience));

        let other: AuthError = Error::from(ErrorKind::InvalidToken).into();
        assert!(matches!(other, AuthError::MalformedToken));
    }

    #[test]
    fn configuration_errors_are_flagged() {
        assert!(AuthError::Configuration("EXPECTED_AUDIENCE").is_configuration());
        assert!(!AuthError::NoMatchingKey.is_configuration());
    }
}
