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

//! Axum router configuration for the SSO API.

pub mod sso;

use axum::{routing::get, Router};

use crate::state::AppState;

/// Build the application router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login/{provider}", get(sso::login))
        .route("/callback/{provider}", get(sso::callback))
        .route("/providers", get(sso::providers))
}
