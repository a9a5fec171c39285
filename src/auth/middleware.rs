// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Runs the [`AuthorizationGate`] in front of every route of the router it is
//! layered on. Admitted requests carry their [`VerifiedIdentity`] (if any) in
//! the request extensions; denied requests get the uniform 403 response.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/protected", get(protected_handler))
//!     .layer(axum::middleware::from_fn_with_state(gate, access_gate));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::gate::{AuthDecision, AuthorizationGate};

/// Authentication middleware function.
pub async fn access_gate(
    State(gate): State<Arc<AuthorizationGate>>,
    request: Request,
    next: Next,
) -> Response {
    // The body is not `Sync`; only the head is borrowed across the await.
    let (mut parts, body) = request.into_parts();
    let decision = gate.authorize(parts.uri.path(), &parts.headers).await;

    match decision {
        AuthDecision::Admit(identity) => {
            if let Some(identity) = identity {
                parts.extensions.insert(identity);
            }
            next.run(Request::from_parts(parts, body)).await
        }
        AuthDecision::Deny(reason) => reason.into_response(),
    }
}
