// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{OptionalAuth, VerifiedIdentity};

/// Identity the gate attached to this request.
#[derive(Debug, Serialize, ToSchema)]
pub struct WhoAmIResponse {
    /// `null` when the request was admitted without credentials (gate
    /// disabled or bypass path).
    pub identity: Option<VerifiedIdentity>,
}

#[utoipa::path(
    get,
    path = "/api/v1/whoami",
    tag = "Identity",
    responses(
        (status = 200, description = "Resolved identity", body = WhoAmIResponse),
        (status = 403, description = "Access denied")
    )
)]
pub async fn whoami(OptionalAuth(identity): OptionalAuth) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse { identity })
}
