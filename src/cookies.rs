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

//! Cookie plumbing for the login handshake and the issued session.
//!
//! Handshake state never outlives the redirect round-trip: the state, nonce,
//! and optional team binding ride in short-lived HttpOnly cookies scoped to
//! the provider name, and every callback response clears them.

use axum::http::HeaderMap;

/// Handshake cookies live just long enough for the IdP round-trip.
pub const HANDSHAKE_MAX_AGE_SECS: u32 = 600;

/// Session cookie name, shared with the rest of the application.
pub const SESSION_COOKIE: &str = "session-token";

pub fn state_cookie_name(provider: &str) -> String {
    format!("oauth_state_{provider}")
}

pub fn nonce_cookie_name(provider: &str) -> String {
    format!("oauth_nonce_{provider}")
}

pub fn team_cookie_name(provider: &str) -> String {
    format!("oauth_teamid_{provider}")
}

/// Attributes shared by every cookie we set.
#[derive(Clone, Debug, Default)]
pub struct CookieScope {
    pub domain: Option<String>,
    pub secure: bool,
}

impl CookieScope {
    fn suffix(&self) -> String {
        let mut suffix = String::new();
        if let Some(domain) = &self.domain {
            suffix.push_str("; Domain=");
            suffix.push_str(domain);
        }
        if self.secure {
            suffix.push_str("; Secure");
        }
        suffix
    }
}

/// A short-lived handshake cookie. SameSite=Lax so the cookie survives the
/// top-level redirect back from the IdP.
pub fn handshake_cookie(name: &str, value: &str, scope: &CookieScope) -> String {
    format!(
        "{name}={value}; Path=/; Max-Age={HANDSHAKE_MAX_AGE_SECS}; HttpOnly; SameSite=Lax{}",
        scope.suffix()
    )
}

/// Expire a handshake cookie immediately.
pub fn clear_cookie(name: &str, scope: &CookieScope) -> String {
    format!(
        "{name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax{}",
        scope.suffix()
    )
}

/// The session cookie set after a successful login.
pub fn session_cookie(token: &str, scope: &CookieScope) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax{}",
        scope.suffix()
    )
}

/// Pull a single cookie value out of the request's `Cookie` header.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    for pair in header.split(';') {
        let pair = pair.trim();
        if let Some((key, value)) = pair.split_once('=') {
            if key == name {
                return Some(value.to_string());
            }
        }
    }
    None
}
