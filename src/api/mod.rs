// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{routing::get, Router};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{access_gate, VerifiedIdentity},
    error::ApiError,
    state::AppState,
};

pub mod health;
pub mod whoami;

/// Build the protected application with the gate in front of every route.
///
/// The gate also covers `/docs` and the fallback; list them in
/// `BYPASS_PATHS` to expose them without credentials.
pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/whoami", get(whoami::whoami))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.gate.clone(),
            access_gate,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

#[derive(OpenApi)]
#[openapi(
    paths(health::liveness, health::readiness, whoami::whoami),
    components(schemas(
        VerifiedIdentity,
        health::HealthResponse,
        health::ReadyResponse,
        health::HealthChecks,
        whoami::WhoAmIResponse
    )),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Identity", description = "Identity resolved by the access gate")
    )
)]
struct ApiDoc;
