// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use access_gate::{
    config::{bind_address, init_tracing, EdgeConfig, DEFAULT_EDGE_PORT},
    proxy::{router, EdgeForwarder},
    server::{cancel_on_signal, serve},
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let forwarder = match EdgeConfig::from_env().and_then(EdgeForwarder::new) {
        Ok(forwarder) => forwarder,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load edge configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        service_token = forwarder.injects_service_token(),
        "Edge configuration loaded"
    );

    let addr = match bind_address(DEFAULT_EDGE_PORT) {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, "Invalid bind address");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    tracing::info!(%addr, "Edge forwarder starting");
    if let Err(e) = serve(router(forwarder), addr, shutdown).await {
        tracing::error!(error = %e, "Server failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
