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

//! The callback half of the login handshake.
//!
//! One callback is one linear pass through the guards below; there is no
//! request-scoped shared state, so concurrent handshakes never interact.
//! Every rejection is terminal and carries the [`AuthError`] that caused it;
//! the route layer turns all of them into the same generic login redirect.

use std::sync::Arc;

use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::error::AuthError;
use crate::registry::{email_domain, ProviderRegistry};
use crate::store::{Session, SessionIssuer, TeamStore, UserRecord, UserStore};

/// Query parameters the provider redirects back with.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CallbackRequest {
    #[serde(skip)]
    pub provider: String,
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Handshake cookies recovered from the callback request.
#[derive(Debug, Clone, Default)]
pub struct HandshakeCookies {
    pub state: Option<String>,
    pub nonce: Option<String>,
    pub team_id: Option<String>,
}

/// Terminal handshake result.
#[derive(Debug)]
pub enum CallbackOutcome {
    SessionIssued { user: UserRecord, session: Session },
    Rejected { error: AuthError },
}

/// Runs the callback protocol against the registry and the stores.
pub struct Handshake {
    registry: Arc<ProviderRegistry>,
    users: Arc<dyn UserStore>,
    teams: Arc<dyn TeamStore>,
    sessions: Arc<dyn SessionIssuer>,
}

impl Handshake {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        users: Arc<dyn UserStore>,
        teams: Arc<dyn TeamStore>,
        sessions: Arc<dyn SessionIssuer>,
    ) -> Self {
        Self {
            registry,
            users,
            teams,
            sessions,
        }
    }

    /// Drive a provider callback to a session or a rejection.
    pub async fn run(
        &self,
        request: &CallbackRequest,
        cookies: &HandshakeCookies,
    ) -> CallbackOutcome {
        match self.try_run(request, cookies).await {
            Ok((user, session)) => CallbackOutcome::SessionIssued { user, session },
            Err(error) => {
                warn!(
                    provider = %request.provider,
                    kind = error.kind(),
                    "sso callback rejected: {error}"
                );
                CallbackOutcome::Rejected { error }
            }
        }
    }

    async fn try_run(
        &self,
        request: &CallbackRequest,
        cookies: &HandshakeCookies,
    ) -> Result<(UserRecord, Session), AuthError> {
        // Provider signalled failure before we ever got a code.
        if let Some(error) = &request.error {
            let detail = request
                .error_description
                .clone()
                .unwrap_or_else(|| error.clone());
            return Err(AuthError::ProviderDenied(detail));
        }

        let state_param = request.state.as_deref().unwrap_or_default();
        let state_cookie = cookies.state.as_deref().unwrap_or_default();
        if !states_match(state_param, state_cookie) {
            return Err(AuthError::CsrfStateMismatch);
        }

        let nonce = cookies
            .nonce
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or(AuthError::MissingNonce)?;

        let code = request
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::MissingCode)?;

        let team_id = cookies.team_id.as_deref().filter(|t| !t.is_empty());

        let provider = self
            .registry
            .get_provider(&request.provider, team_id)
            .await?
            .ok_or_else(|| AuthError::ProviderNotConfigured(request.provider.clone()))?;

        let (_tokens, claims) = provider.handle_callback(code, nonce).await?;

        let email = claims
            .email
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or(AuthError::MissingEmail)?;
        if claims.sub.is_empty() {
            return Err(AuthError::MissingEmail);
        }

        // A bound team must genuinely own the email's domain. The binding
        // rode in a client cookie, so trust nothing about it.
        if let Some(team_id) = team_id {
            self.validate_team_binding(team_id, email).await?;
        }

        let user = self
            .link_account(email, &claims, &request.provider, team_id)
            .await?;

        let session = self.sessions.create_session(&user.id).await?;
        info!(
            provider = %request.provider,
            user_id = %user.id,
            "sso login completed"
        );
        Ok((user, session))
    }

    async fn validate_team_binding(&self, team_id: &str, email: &str) -> Result<(), AuthError> {
        let domain = email_domain(email).ok_or(AuthError::InvalidTeamAssociation)?;
        self.teams
            .find_sso_config(team_id)
            .await?
            .filter(|c| c.sso_enabled && c.domains.iter().any(|d| d == &domain))
            .ok_or(AuthError::InvalidTeamAssociation)?;
        Ok(())
    }

    async fn link_account(
        &self,
        email: &str,
        claims: &crate::jwt::IdTokenClaims,
        provider: &str,
        team_id: Option<&str>,
    ) -> Result<UserRecord, AuthError> {
        let user = match self.users.find_user_by_email(email).await? {
            None => {
                let name = claims.display_name();
                let name = (!name.is_empty()).then_some(name);
                let user = self.users.create_user(email, name.as_deref()).await?;
                info!(user_id = %user.id, "provisioned user from sso");
                user
            }
            Some(user) => {
                match (&user.sso_provider, &user.sso_subject) {
                    // Never move a linked account to another identity.
                    (Some(p), Some(s)) if p != provider || s != &claims.sub => {
                        return Err(AuthError::AccountProviderMismatch);
                    }
                    _ => {}
                }
                user
            }
        };

        self.users
            .link_provider_to_user(&user.id, provider, &claims.sub, team_id)
            .await?;

        // Re-read so the caller sees the linkage we just wrote.
        self.users
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AuthError::Internal("linked user vanished".to_string()))
    }
}

/// Timing-safe state comparison. The length gate runs first; equal-length
/// comparisons take constant time.
fn states_match(param: &str, cookie: &str) -> bool {
    if param.is_empty() || cookie.is_empty() || param.len() != cookie.len() {
        return false;
    }
    param.as_bytes().ct_eq(cookie.as_bytes()).into()
}
