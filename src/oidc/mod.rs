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

//! OIDC provider plumbing: `.well-known` discovery, the issuer-shared JWKS
//! cache, and the per-provider client that drives the authorization-code
//! flow.

pub mod discovery;
pub mod jwks_cache;
pub mod provider;

pub use discovery::{DiscoveryClient, DiscoveryDocument};
pub use jwks_cache::{JwksCache, JWKS_TTL_SECS};
pub use provider::{ProviderClient, ProviderSettings, TokenResponse, UserInfo};
