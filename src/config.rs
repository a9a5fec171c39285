// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! typed configuration loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AUTH_ENABLED` | Master switch for the authentication gate | enabled |
//! | `ISSUER_TEAM_DOMAIN` | Access team domain (JWKS URL + expected issuer) | Required for assertions |
//! | `JWKS_URL` | Override for the derived certs endpoint | derived from team domain |
//! | `EXPECTED_AUDIENCE` | Required `aud` claim value | Required for assertions |
//! | `BYPASS_PATHS` | Comma-separated exact or `prefix*` paths exempt from auth | empty |
//! | `SERVICE_TOKEN_ID` | Expected (gate) or injected (edge) service token client id | unset |
//! | `SERVICE_TOKEN_SECRET` | Expected (gate) or injected (edge) service token secret | unset |
//! | `UPSTREAM_URL` | Edge forwarder target application URL | Required for the edge |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` (gate), `8081` (edge) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::auth::{BypassRule, Issuer};

pub const AUTH_ENABLED_ENV: &str = "AUTH_ENABLED";
pub const ISSUER_TEAM_DOMAIN_ENV: &str = "ISSUER_TEAM_DOMAIN";
pub const JWKS_URL_ENV: &str = "JWKS_URL";
pub const EXPECTED_AUDIENCE_ENV: &str = "EXPECTED_AUDIENCE";
pub const BYPASS_PATHS_ENV: &str = "BYPASS_PATHS";
pub const SERVICE_TOKEN_ID_ENV: &str = "SERVICE_TOKEN_ID";
pub const SERVICE_TOKEN_SECRET_ENV: &str = "SERVICE_TOKEN_SECRET";
pub const UPSTREAM_URL_ENV: &str = "UPSTREAM_URL";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_GATE_PORT: u16 = 8080;
pub const DEFAULT_EDGE_PORT: u16 = 8081;
const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is required")]
    Missing { name: &'static str },
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("HTTP client could not be built: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Settings consumed by the authorization gate.
///
/// `team_domain` and `audience` stay optional here: a gate without them still
/// serves bypassed paths and service tokens, while every signed assertion is
/// denied as a configuration failure.
#[derive(Debug, Clone, Default)]
pub struct GateConfig {
    pub enabled: bool,
    pub team_domain: Option<String>,
    /// Fetch keys here instead of the team's well-known certs endpoint.
    pub jwks_url: Option<String>,
    pub audience: Option<String>,
    pub bypass: Vec<BypassRule>,
    pub service_token: ServiceTokenConfig,
}

/// Expected (or, for the edge, injected) service token pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceTokenConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl ServiceTokenConfig {
    /// Both halves, if both are configured.
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        Self {
            client_id: non_empty(lookup(SERVICE_TOKEN_ID_ENV)),
            client_secret: non_empty(lookup(SERVICE_TOKEN_SECRET_ENV)),
        }
    }
}

impl GateConfig {
    /// Load gate settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load gate settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            enabled: parse_enabled(lookup(AUTH_ENABLED_ENV).as_deref()),
            team_domain: non_empty(lookup(ISSUER_TEAM_DOMAIN_ENV)),
            jwks_url: non_empty(lookup(JWKS_URL_ENV)),
            audience: non_empty(lookup(EXPECTED_AUDIENCE_ENV)),
            bypass: lookup(BYPASS_PATHS_ENV)
                .map(|raw| BypassRule::parse_list(&raw))
                .unwrap_or_default(),
            service_token: ServiceTokenConfig::from_lookup(&lookup),
        }
    }

    /// The trusted issuer, if a team domain is configured.
    pub fn issuer(&self) -> Option<Issuer> {
        let issuer = Issuer::from_team_domain(self.team_domain.as_deref()?);
        Some(match &self.jwks_url {
            Some(url) => issuer.with_certs_url(url.clone()),
            None => issuer,
        })
    }
}

/// Settings consumed by the edge forwarder.
#[derive(Debug, Clone)]
pub struct EdgeConfig {
    pub upstream: Url,
    pub service_token: ServiceTokenConfig,
}

impl EdgeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw = non_empty(lookup(UPSTREAM_URL_ENV)).ok_or(ConfigError::Missing {
            name: UPSTREAM_URL_ENV,
        })?;
        let upstream = Url::parse(&raw).map_err(|e| ConfigError::Invalid {
            name: UPSTREAM_URL_ENV,
            reason: e.to_string(),
        })?;
        if !matches!(upstream.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                name: UPSTREAM_URL_ENV,
                reason: format!("unsupported scheme '{}'", upstream.scheme()),
            });
        }

        Ok(Self {
            upstream,
            service_token: ServiceTokenConfig::from_lookup(&lookup),
        })
    }
}

/// Resolve the bind address from `HOST` / `PORT`.
pub fn bind_address(default_port: u16) -> Result<SocketAddr, ConfigError> {
    let host = env::var(HOST_ENV).unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = match env::var(PORT_ENV) {
        Ok(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
            name: PORT_ENV,
            reason: e.to_string(),
        })?,
        Err(_) => default_port,
    };

    format!("{host}:{port}")
        .parse()
        .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            name: HOST_ENV,
            reason: e.to_string(),
        })
}

/// Install the global tracing subscriber.
///
/// `LOG_FORMAT=json` selects JSON lines, anything else the human-readable
/// formatter. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// The gate is on unless explicitly switched off.
fn parse_enabled(raw: Option<&str>) -> bool {
    match raw.map(str::trim) {
        Some(v) => !matches!(
            v.to_ascii_lowercase().as_str(),
            "false" | "0" | "no" | "off"
        ),
        None => true,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn gate_defaults_to_enabled() {
        let config = GateConfig::from_lookup(lookup(&[]));
        assert!(config.enabled);
        assert!(config.bypass.is_empty());
        assert!(config.team_domain.is_none());
        assert!(config.service_token.pair().is_none());
    }

    #[test]
    fn auth_enabled_accepts_common_off_values() {
        for off in ["false", "FALSE", "0", "no", "off", " Off "] {
            let config = GateConfig::from_lookup(lookup(&[(AUTH_ENABLED_ENV, off)]));
            assert!(!config.enabled, "{off} should disable the gate");
        }
        let config = GateConfig::from_lookup(lookup(&[(AUTH_ENABLED_ENV, "true")]));
        assert!(config.enabled);
    }

    #[test]
    fn gate_reads_all_settings() {
        let config = GateConfig::from_lookup(lookup(&[
            (ISSUER_TEAM_DOMAIN_ENV, "acme"),
            (EXPECTED_AUDIENCE_ENV, "aud-123"),
            (BYPASS_PATHS_ENV, "/api/v1/health, /public/*"),
            (SERVICE_TOKEN_ID_ENV, "client.access"),
            (SERVICE_TOKEN_SECRET_ENV, "s3cret"),
        ]));
        assert_eq!(config.team_domain.as_deref(), Some("acme"));
        assert_eq!(config.audience.as_deref(), Some("aud-123"));
        assert_eq!(config.bypass.len(), 2);
        assert_eq!(config.service_token.pair(), Some(("client.access", "s3cret")));
    }

    #[test]
    fn issuer_derives_from_team_domain_with_optional_jwks_override() {
        let config = GateConfig::from_lookup(lookup(&[(ISSUER_TEAM_DOMAIN_ENV, "acme")]));
        let issuer = config.issuer().unwrap();
        assert_eq!(issuer.issuer(), "https://acme.cloudflareaccess.com");
        assert_eq!(
            issuer.certs_url(),
            "https://acme.cloudflareaccess.com/cdn-cgi/access/certs"
        );

        let config = GateConfig::from_lookup(lookup(&[
            (ISSUER_TEAM_DOMAIN_ENV, "acme"),
            (JWKS_URL_ENV, "http://127.0.0.1:9000/certs"),
        ]));
        let issuer = config.issuer().unwrap();
        assert_eq!(issuer.issuer(), "https://acme.cloudflareaccess.com");
        assert_eq!(issuer.certs_url(), "http://127.0.0.1:9000/certs");

        assert!(GateConfig::default().issuer().is_none());
    }

    #[test]
    fn blank_values_are_treated_as_unset() {
        let config = GateConfig::from_lookup(lookup(&[
            (EXPECTED_AUDIENCE_ENV, "   "),
            (SERVICE_TOKEN_ID_ENV, ""),
        ]));
        assert!(config.audience.is_none());
        assert!(config.service_token.client_id.is_none());
    }

    #[test]
    fn edge_requires_upstream() {
        let err = EdgeConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { name: UPSTREAM_URL_ENV }));
    }

    #[test]
    fn edge_rejects_non_http_upstream() {
        let err = EdgeConfig::from_lookup(lookup(&[(UPSTREAM_URL_ENV, "ftp://app.internal")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn http_client_failure_is_a_config_error() {
        let err = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        let err = ConfigError::from(err);
        assert!(matches!(err, ConfigError::HttpClient(_)));
        assert!(err.to_string().starts_with("HTTP client could not be built"));
    }

    #[test]
    fn edge_parses_upstream_and_token() {
        let config = EdgeConfig::from_lookup(lookup(&[
            (UPSTREAM_URL_ENV, "http://10.0.0.5:8080"),
            (SERVICE_TOKEN_ID_ENV, "id"),
            (SERVICE_TOKEN_SECRET_ENV, "secret"),
        ]))
        .unwrap();
        assert_eq!(config.upstream.as_str(), "http://10.0.0.5:8080/");
        assert_eq!(config.service_token.pair(), Some(("id", "secret")));
    }
}
