// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access Gate - request authentication in front of an internal application
//!
//! This crate admits or denies requests based on Cloudflare Access style
//! credentials, and ships a companion edge forwarder that hides the
//! application's address.
//!
//! ## Modules
//!
//! - `auth` - Key cache, assertion verification, bypass paths, the gate and its middleware
//! - `api` - The protected application surface (Axum)
//! - `proxy` - Edge forwarder
//! - `config` - Environment configuration and tracing setup

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod proxy;
pub mod server;
pub mod state;
