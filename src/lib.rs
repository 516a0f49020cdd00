/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Enterprise SSO API library.
//!
//! This crate provides OIDC login against configured identity providers:
//! RS256 ID-token verification built on RSA primitives, provider discovery
//! with a shared JWKS cache, multi-tenant provider resolution, and the
//! stateful callback handshake that links provider identities to accounts
//! and issues sessions. The binary entry point (`main.rs`) is a thin wrapper
//! that calls into this library.

pub mod config;
pub mod cookies;
pub mod error;
pub mod handshake;
pub mod jwt;
pub mod oidc;
pub mod registry;
pub mod routes;
pub mod state;
pub mod store;
