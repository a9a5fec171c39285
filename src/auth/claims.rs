// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and the verified identity attached to admitted requests.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims read from an Access assertion.
///
/// `iss`, `aud`, `exp` and `nbf` are validated by `jsonwebtoken` before this
/// struct is produced; only the identity-bearing claims are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessClaims {
    /// Subject (Access user ID)
    #[serde(default)]
    pub sub: Option<String>,

    /// User email (absent for service-token issued assertions)
    #[serde(default)]
    pub email: Option<String>,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: Option<i64>,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Identity resolved by the gate for an admitted request.
///
/// Lives in the request extensions for the duration of one request only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerifiedIdentity {
    /// Admitted through the service-token header pair
    ServiceToken {
        #[serde(rename = "clientId")]
        client_id: String,
    },
    /// Admitted through a verified signed assertion
    SignedAssertion {
        #[serde(skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sub: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        iat: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        exp: Option<i64>,
    },
}

impl VerifiedIdentity {
    pub fn service_token(client_id: impl Into<String>) -> Self {
        VerifiedIdentity::ServiceToken {
            client_id: client_id.into(),
        }
    }

    /// Create from verified assertion claims.
    pub fn from_claims(claims: AccessClaims) -> Self {
        VerifiedIdentity::SignedAssertion {
            email: claims.email,
            sub: claims.sub,
            iat: claims.iat,
            exp: claims.exp,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            VerifiedIdentity::ServiceToken { .. } => "service_token",
            VerifiedIdentity::SignedAssertion { .. } => "signed_assertion",
        }
    }

    /// Short label for logs: client id or subject.
    pub fn principal(&self) -> Option<&str> {
        match self {
            VerifiedIdentity::ServiceToken { client_id } => Some(client_id),
            VerifiedIdentity::SignedAssertion { sub, email, .. } => {
                sub.as_deref().or(email.as_deref())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_token_serializes_with_client_id() {
        let identity = VerifiedIdentity::service_token("abc.access");
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "service_token", "clientId": "abc.access"})
        );
    }

    #[test]
    fn assertion_identity_keeps_present_claims_only() {
        let claims: AccessClaims = serde_json::from_value(serde_json::json!({
            "sub": "user-1",
            "email": "ops@example.com",
            "exp": 1700003600,
            "iss": "https://acme.cloudflareaccess.com"
        }))
        .unwrap();

        let identity = VerifiedIdentity::from_claims(claims);
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["kind"], "signed_assertion");
        assert_eq!(json["sub"], "user-1");
        assert_eq!(json["email"], "ops@example.com");
        assert_eq!(json["exp"], 1700003600);
        assert!(json.get("iat").is_none());
    }

    #[test]
    fn principal_prefers_subject() {
        let identity = VerifiedIdentity::SignedAssertion {
            email: Some("ops@example.com".into()),
            sub: None,
            iat: None,
            exp: None,
        };
        assert_eq!(identity.principal(), Some("ops@example.com"));
        assert_eq!(identity.kind(), "signed_assertion");
    }
}
