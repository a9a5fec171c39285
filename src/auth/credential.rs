// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential extraction from request headers.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// Service token client id header.
pub const CLIENT_ID_HEADER: HeaderName = HeaderName::from_static("cf-access-client-id");
/// Service token client secret header.
pub const CLIENT_SECRET_HEADER: HeaderName = HeaderName::from_static("cf-access-client-secret");
/// Signed assertion header.
pub const ASSERTION_HEADER: HeaderName = HeaderName::from_static("cf-access-jwt-assertion");

/// The single credential a request is judged on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Both service token headers were present.
    ServiceToken {
        client_id: HeaderValue,
        client_secret: HeaderValue,
    },
    /// Only the assertion header was present.
    SignedAssertion { raw_token: HeaderValue },
}

impl Credential {
    /// Extract the credential to check, if any.
    ///
    /// Service token headers win over an assertion. A lone client id or
    /// client secret is not a service token.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        if let (Some(client_id), Some(client_secret)) = (
            headers.get(&CLIENT_ID_HEADER),
            headers.get(&CLIENT_SECRET_HEADER),
        ) {
            return Some(Credential::ServiceToken {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            });
        }

        headers
            .get(&ASSERTION_HEADER)
            .map(|raw_token| Credential::SignedAssertion {
                raw_token: raw_token.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert((*name).clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn no_headers_means_no_credential() {
        assert_eq!(Credential::from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn service_token_takes_priority() {
        let map = headers(&[
            (&CLIENT_ID_HEADER, "id"),
            (&CLIENT_SECRET_HEADER, "secret"),
            (&ASSERTION_HEADER, "a.b.c"),
        ]);
        assert!(matches!(
            Credential::from_headers(&map),
            Some(Credential::ServiceToken { .. })
        ));
    }

    #[test]
    fn lone_client_id_falls_back_to_assertion() {
        let map = headers(&[(&CLIENT_ID_HEADER, "id"), (&ASSERTION_HEADER, "a.b.c")]);
        assert_eq!(
            Credential::from_headers(&map),
            Some(Credential::SignedAssertion {
                raw_token: HeaderValue::from_static("a.b.c")
            })
        );
    }

    #[test]
    fn lone_client_secret_is_no_credential() {
        let map = headers(&[(&CLIENT_SECRET_HEADER, "secret")]);
        assert_eq!(Credential::from_headers(&map), None);
    }

    #[test]
    fn header_names_are_case_insensitive() {
        let mut map = HeaderMap::new();
        map.insert(
            HeaderName::from_bytes(b"CF-Access-Jwt-Assertion").unwrap(),
            HeaderValue::from_static("t"),
        );
        assert!(Credential::from_headers(&map).is_some());
    }
}
