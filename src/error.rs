// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Non-authentication failures surfaced to clients.
//!
//! Access denials have their own body (see [`crate::auth::DenyReason`]); this
//! covers unknown routes on the gate and forwarding failures on the edge.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found")]
    NotFound,

    /// The inbound body could not be buffered for forwarding.
    #[error("Failed to read request body: {0}")]
    RequestBody(String),

    /// Connecting to or exchanging with the upstream failed. The cause is
    /// logged, never returned.
    #[error("Upstream unavailable")]
    UpstreamUnavailable,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::RequestBody(_) => StatusCode::BAD_REQUEST,
            ApiError::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            success: false,
            error: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}
