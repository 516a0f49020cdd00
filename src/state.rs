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

//! Shared application state handed to every route.

use std::sync::Arc;

use crate::cookies::CookieScope;
use crate::handshake::Handshake;
use crate::registry::ProviderRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ProviderRegistry>,
    pub handshake: Arc<Handshake>,
    /// Where rejected callbacks land.
    pub login_url: String,
    /// Where successful logins land.
    pub after_login_url: String,
    pub cookie_scope: CookieScope,
}
