// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Security
//!
//! - Keys are fetched from the issuer's well-known certs endpoint
//! - A fetched key set is served for one hour, then refreshed on the next use
//! - A failed refresh leaves the cache untouched and fails the request; a
//!   stale key set is never served as a fallback (fail-closed)
//!
//! ## Concurrency
//!
//! The cache entry is swapped as a whole under a short write lock. No lock is
//! held across the network call, so concurrent requests that see a stale
//! entry may each fetch; the last complete fetch wins.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;

use super::error::AuthError;

/// Key set freshness window.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Timeout applied to every JWKS fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const ACCESS_DOMAIN_SUFFIX: &str = ".cloudflareaccess.com";
const CERTS_PATH: &str = "/cdn-cgi/access/certs";

/// Where an issuer's keys live and what its tokens claim as `iss`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issuer {
    issuer: String,
    certs_url: String,
}

impl Issuer {
    /// Derive the issuer from an Access team domain.
    ///
    /// Accepts `acme`, `acme.cloudflareaccess.com` or
    /// `https://acme.cloudflareaccess.com/`.
    pub fn from_team_domain(team_domain: &str) -> Self {
        let team = team_domain
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        let team = team.strip_suffix(ACCESS_DOMAIN_SUFFIX).unwrap_or(team);

        let issuer = format!("https://{team}{ACCESS_DOMAIN_SUFFIX}");
        let certs_url = format!("{issuer}{CERTS_PATH}");
        Self { issuer, certs_url }
    }

    /// Explicit issuer and certs URL (self-hosted or test issuers).
    pub fn new(issuer: impl Into<String>, certs_url: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            certs_url: certs_url.into(),
        }
    }

    /// Same issuer, keys fetched from `certs_url`.
    pub fn with_certs_url(mut self, certs_url: impl Into<String>) -> Self {
        self.certs_url = certs_url.into();
        self
    }

    /// Expected `iss` claim.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn certs_url(&self) -> &str {
        &self.certs_url
    }
}

/// Source of the current time for freshness checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// An immutable, fetched key set.
#[derive(Debug, Clone)]
pub struct KeySet {
    keys: JwkSet,
    fetched_at: Instant,
}

impl KeySet {
    pub fn new(keys: JwkSet, fetched_at: Instant) -> Self {
        Self { keys, fetched_at }
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    /// Number of published keys.
    pub fn key_count(&self) -> usize {
        self.keys.keys.len()
    }

    /// Get a decoding key for the given key ID.
    pub fn decoding_key(&self, kid: &str) -> Result<(DecodingKey, Algorithm), AuthError> {
        let jwk = self
            .keys
            .keys
            .iter()
            .find(|k| k.common.key_id.as_deref() == Some(kid))
            .ok_or(AuthError::NoMatchingKey)?;

        jwk_to_decoding_key(jwk)
    }
}

/// JWKS cache entry.
struct CacheEntry {
    certs_url: String,
    key_set: Arc<KeySet>,
}

/// Key set cache with a fixed freshness TTL.
///
/// Cheap to clone; clones share the same cache.
#[derive(Clone)]
pub struct KeySetCache {
    /// Cache TTL
    cache_ttl: Duration,
    /// Cached key set
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// HTTP client
    client: reqwest::Client,
    clock: Arc<dyn Clock>,
}

impl KeySetCache {
    /// Cache with the default TTL and a fetch client bounded by the fetch
    /// timeout. Fails if that client cannot be built.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;

        Ok(Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(None)),
            client,
            clock: Arc::new(SystemClock),
        })
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Replace the clock used for freshness checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Current key set for `issuer`, fetching it when absent or stale.
    pub async fn get_key_set(&self, issuer: &Issuer) -> Result<Arc<KeySet>, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if entry.certs_url == issuer.certs_url() && self.is_fresh(&entry.key_set) {
                    tracing::trace!(target: "gate.jwks", "JWKS cache hit");
                    return Ok(entry.key_set.clone());
                }
            }
        }

        self.refresh(issuer).await
    }

    /// Fetch the key set and replace the cache entry.
    pub async fn refresh(&self, issuer: &Issuer) -> Result<Arc<KeySet>, AuthError> {
        let keys = self.fetch_jwks(issuer.certs_url()).await?;
        let key_set = Arc::new(KeySet::new(keys, self.clock.now()));

        tracing::info!(
            target: "gate.jwks",
            url = %issuer.certs_url(),
            keys = key_set.key_count(),
            "JWKS refreshed"
        );

        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            certs_url: issuer.certs_url().to_string(),
            key_set: key_set.clone(),
        });

        Ok(key_set)
    }

    /// Check if a fresh key set is cached for `issuer`.
    pub async fn is_cached(&self, issuer: &Issuer) -> bool {
        let cache = self.cache.read().await;
        match &*cache {
            Some(entry) => entry.certs_url == issuer.certs_url() && self.is_fresh(&entry.key_set),
            None => false,
        }
    }

    fn is_fresh(&self, key_set: &KeySet) -> bool {
        self.clock
            .now()
            .saturating_duration_since(key_set.fetched_at)
            < self.cache_ttl
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self, url: &str) -> Result<JwkSet, AuthError> {
        tracing::debug!(target: "gate.jwks", url = %url, "Fetching JWKS");

        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::error!(target: "gate.jwks", error = %e, "Failed to fetch JWKS");
            AuthError::JwksFetchError(e.to_string())
        })?;

        if !response.status().is_success() {
            tracing::error!(target: "gate.jwks", status = %response.status(), "JWKS endpoint returned error");
            return Err(AuthError::JwksFetchError(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response.json::<JwkSet>().await.map_err(|e| {
            tracing::error!(target: "gate.jwks", error = %e, "Failed to parse JWKS response");
            AuthError::JwksFetchError(e.to_string())
        })
    }
}

/// Convert a JWK to a DecodingKey.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| AuthError::UnsupportedKey(format!("RSA key: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                _ => Algorithm::RS256,
            };

            Ok((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| AuthError::UnsupportedKey(format!("EC key: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            };

            Ok((key, alg))
        }
        AlgorithmParameters::OctetKeyPair(okp) => {
            let key = DecodingKey::from_ed_components(&okp.x)
                .map_err(|e| AuthError::UnsupportedKey(format!("OKP key: {e}")))?;
            Ok((key, Algorithm::EdDSA))
        }
        _ => Err(AuthError::UnsupportedKey(
            "symmetric keys are not accepted".to_string(),
        )),
    }
}
