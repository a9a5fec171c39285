// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use access_gate::{
    api::router,
    config::{bind_address, init_tracing, GateConfig, DEFAULT_GATE_PORT},
    server::{cancel_on_signal, serve},
    state::AppState,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = GateConfig::from_env();
    if !config.enabled {
        tracing::warn!("AUTH_ENABLED is off: every request will be admitted");
    } else if config.team_domain.is_none() || config.audience.is_none() {
        tracing::warn!(
            "ISSUER_TEAM_DOMAIN or EXPECTED_AUDIENCE is not set: signed assertions will be denied"
        );
    }
    tracing::info!(
        enabled = config.enabled,
        team_domain = config.team_domain.as_deref().unwrap_or("-"),
        bypass_rules = config.bypass.len(),
        service_token = config.service_token.pair().is_some(),
        "Gate configuration loaded"
    );

    let addr = match bind_address(DEFAULT_GATE_PORT) {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, "Invalid bind address");
            return ExitCode::FAILURE;
        }
    };

    let state = match AppState::from_config(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialise the gate");
            return ExitCode::FAILURE;
        }
    };

    let app = router(state);
    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    tracing::info!(%addr, "Access gate starting (docs at /docs)");
    if let Err(e) = serve(app, addr, shutdown).await {
        tracing::error!(error = %e, "Server failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
