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

//! SSO route handlers: login initiation and the provider callback.
//!
//! `GET /login/{provider}` starts the handshake: random state and nonce go
//! into short-lived HttpOnly cookies and the user is redirected to the
//! provider's authorization endpoint. `GET /callback/{provider}` finishes it.
//! Rejected callbacks all land on the same generic login redirect so the
//! error surface enumerates nothing.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::Deserialize;

use crate::cookies;
use crate::handshake::{CallbackOutcome, CallbackRequest, HandshakeCookies};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Optional email used to route the login to a team-scoped provider.
    pub email: Option<String>,
}

/// GET /login/{provider}?email=<addr>
///
/// Initiates the handshake: binds a team when the email's domain belongs to
/// one, sets the state/nonce cookies, and redirects to the IdP.
pub async fn login(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<LoginQuery>,
) -> Response {
    let team_id = match resolve_team(&state, &provider, query.email.as_deref()).await {
        Ok(team_id) => team_id,
        Err(response) => return response,
    };

    let client = match state.registry.get_provider(&provider, team_id.as_deref()).await {
        Ok(Some(client)) => client,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "provider_not_configured" })),
            )
                .into_response();
        }
        Err(error) => {
            tracing::error!(provider = %provider, "provider resolution failed: {error}");
            return failure_redirect(&state);
        }
    };

    let handshake_state = random_token();
    let nonce = random_token();

    let auth_url = match client.authorization_url(&handshake_state, &nonce).await {
        Ok(url) => url,
        Err(error) => {
            tracing::error!(provider = %provider, "login initiation failed: {error}");
            return failure_redirect(&state);
        }
    };

    let mut response = Redirect::to(&auth_url).into_response();
    set_cookie(
        &mut response,
        cookies::handshake_cookie(
            &cookies::state_cookie_name(&provider),
            &handshake_state,
            &state.cookie_scope,
        ),
    );
    set_cookie(
        &mut response,
        cookies::handshake_cookie(
            &cookies::nonce_cookie_name(&provider),
            &nonce,
            &state.cookie_scope,
        ),
    );
    if let Some(team_id) = &team_id {
        set_cookie(
            &mut response,
            cookies::handshake_cookie(
                &cookies::team_cookie_name(&provider),
                team_id,
                &state.cookie_scope,
            ),
        );
    }
    response
}

/// GET /callback/{provider}?code=&state=&error=&error_description=
///
/// Finishes the handshake. Success sets the session cookie and redirects
/// home; any rejection clears the handshake cookies and redirects back to
/// login with a generic error.
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Query(mut request): Query<CallbackRequest>,
) -> Response {
    request.provider = provider.clone();

    let handshake_cookies = HandshakeCookies {
        state: cookies::cookie_value(&headers, &cookies::state_cookie_name(&provider)),
        nonce: cookies::cookie_value(&headers, &cookies::nonce_cookie_name(&provider)),
        team_id: cookies::cookie_value(&headers, &cookies::team_cookie_name(&provider)),
    };

    match state.handshake.run(&request, &handshake_cookies).await {
        CallbackOutcome::SessionIssued { session, .. } => {
            let mut response = Redirect::to(&state.after_login_url).into_response();
            set_cookie(
                &mut response,
                cookies::session_cookie(&session.token, &state.cookie_scope),
            );
            clear_handshake_cookies(&mut response, &provider, &state);
            response
        }
        CallbackOutcome::Rejected { .. } => {
            let mut response = failure_redirect(&state);
            clear_handshake_cookies(&mut response, &provider, &state);
            response
        }
    }
}

/// GET /providers -- globally configured provider names.
pub async fn providers(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "providers": state.registry.configured_providers() }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Bind the login to a team when the email's domain belongs to one and that
/// team uses the requested provider.
async fn resolve_team(
    state: &AppState,
    provider: &str,
    email: Option<&str>,
) -> Result<Option<String>, Response> {
    let Some(email) = email else {
        return Ok(None);
    };
    match state.registry.team_by_email_domain(email).await {
        Ok(Some((team_id, team_provider))) if team_provider == provider => Ok(Some(team_id)),
        Ok(_) => Ok(None),
        Err(error) => {
            tracing::error!(provider = %provider, "team routing failed: {error}");
            Err(failure_redirect(state))
        }
    }
}

fn failure_redirect(state: &AppState) -> Response {
    Redirect::to(&format!("{}?error=sso_failed", state.login_url)).into_response()
}

fn clear_handshake_cookies(response: &mut Response, provider: &str, state: &AppState) {
    for name in [
        cookies::state_cookie_name(provider),
        cookies::nonce_cookie_name(provider),
        cookies::team_cookie_name(provider),
    ] {
        set_cookie(response, cookies::clear_cookie(&name, &state.cookie_scope));
    }
}

fn set_cookie(response: &mut Response, cookie: String) {
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

/// 128-bit random value, base64url without padding (cookie and URL safe).
fn random_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
