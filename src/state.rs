// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthorizationGate, CredentialVerifier, KeySetCache};
use crate::config::{ConfigError, GateConfig};

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AuthorizationGate>,
}

impl AppState {
    pub fn new(gate: AuthorizationGate) -> Self {
        Self {
            gate: Arc::new(gate),
        }
    }

    /// Build the gate from configuration with a fresh key cache.
    pub fn from_config(config: GateConfig) -> Result<Self, ConfigError> {
        let keys = KeySetCache::new()?;
        Ok(Self::new(AuthorizationGate::new(
            config,
            CredentialVerifier::new(keys),
        )))
    }
}
