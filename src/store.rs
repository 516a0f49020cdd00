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

//! Collaborator interfaces the SSO core depends on, and in-memory
//! implementations used by the default binary and the test suites.
//!
//! The user/team database, secret storage, and session issuance live outside
//! this core; these traits are the narrow seams through which it talks to
//! them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::AuthError;

/// A local user account as the SSO core sees it.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    /// Provider name this account is linked to, if any.
    pub sso_provider: Option<String>,
    /// Provider-scoped subject (`sub` claim) this account is linked to.
    pub sso_subject: Option<String>,
    pub team_id: Option<String>,
}

/// An issued session.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub token: String,
    pub csrf_token: String,
}

/// A team's SSO configuration row.
#[derive(Debug, Clone)]
pub struct TeamSsoConfig {
    pub team_id: String,
    pub sso_enabled: bool,
    /// Provider name this team configured (e.g. "okta").
    pub provider: String,
    pub client_id: String,
    /// Client secret ciphertext; decrypted through [`SecretCipher`].
    pub client_secret_ciphertext: String,
    pub issuer: String,
    pub redirect_uri: String,
    /// Email domains this team owns (lowercase).
    pub domains: Vec<String>,
}

/// User account lookup, provisioning, and provider linking.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError>;

    async fn create_user(&self, email: &str, name: Option<&str>) -> Result<UserRecord, AuthError>;

    /// Record the provider linkage (and team association, when bound) for a
    /// user. Idempotent for an identical provider/subject pair.
    async fn link_provider_to_user(
        &self,
        user_id: &str,
        provider: &str,
        subject: &str,
        team_id: Option<&str>,
    ) -> Result<(), AuthError>;
}

/// Team SSO configuration lookup.
#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn find_sso_config(&self, team_id: &str) -> Result<Option<TeamSsoConfig>, AuthError>;

    /// Find an SSO-enabled team that owns `domain` (lowercase).
    async fn find_sso_team_by_domain(
        &self,
        domain: &str,
    ) -> Result<Option<TeamSsoConfig>, AuthError>;
}

/// Session issuance, performed outside this core.
#[async_trait]
pub trait SessionIssuer: Send + Sync {
    async fn create_session(&self, user_id: &str) -> Result<Session, AuthError>;
}

/// Decrypts secrets stored as ciphertext (team client secrets).
pub trait SecretCipher: Send + Sync {
    fn decrypt(&self, ciphertext: &str) -> Result<String, AuthError>;
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

/// In-memory user/team store backing the default binary and the tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserRecord>>,
    teams: RwLock<HashMap<String, TeamSsoConfig>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed a user directly (tests).
    pub async fn insert_user(&self, user: UserRecord) {
        self.users.write().await.insert(user.email.clone(), user);
    }

    /// Seed a team directly (tests).
    pub async fn insert_team(&self, team: TeamSsoConfig) {
        self.teams.write().await.insert(team.team_id.clone(), team);
    }

    /// Snapshot a user by email (tests).
    pub async fn user_by_email(&self, email: &str) -> Option<UserRecord> {
        self.users.read().await.get(email).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn create_user(&self, email: &str, name: Option<&str>) -> Result<UserRecord, AuthError> {
        let user = UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.map(str::to_string),
            sso_provider: None,
            sso_subject: None,
            team_id: None,
        };
        self.users
            .write()
            .await
            .insert(email.to_string(), user.clone());
        Ok(user)
    }

    async fn link_provider_to_user(
        &self,
        user_id: &str,
        provider: &str,
        subject: &str,
        team_id: Option<&str>,
    ) -> Result<(), AuthError> {
        let mut users = self.users.write().await;
        let user = users
            .values_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AuthError::Internal(format!("no such user: {user_id}")))?;
        user.sso_provider = Some(provider.to_string());
        user.sso_subject = Some(subject.to_string());
        if let Some(team) = team_id {
            user.team_id = Some(team.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl TeamStore for MemoryStore {
    async fn find_sso_config(&self, team_id: &str) -> Result<Option<TeamSsoConfig>, AuthError> {
        Ok(self.teams.read().await.get(team_id).cloned())
    }

    async fn find_sso_team_by_domain(
        &self,
        domain: &str,
    ) -> Result<Option<TeamSsoConfig>, AuthError> {
        Ok(self
            .teams
            .read()
            .await
            .values()
            .find(|t| t.sso_enabled && t.domains.iter().any(|d| d == domain))
            .cloned())
    }
}

/// In-memory session issuer: random opaque tokens, no persistence.
#[derive(Debug, Default)]
pub struct MemorySessions;

impl MemorySessions {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl SessionIssuer for MemorySessions {
    async fn create_session(&self, user_id: &str) -> Result<Session, AuthError> {
        tracing::debug!(user_id, "issuing session");
        Ok(Session {
            session_id: uuid::Uuid::new_v4().to_string(),
            token: uuid::Uuid::new_v4().to_string(),
            csrf_token: uuid::Uuid::new_v4().to_string(),
        })
    }
}

/// Pass-through cipher for deployments where team secrets are stored
/// elsewhere already decrypted, and for tests.
#[derive(Debug, Default)]
pub struct NoopCipher;

impl SecretCipher for NoopCipher {
    fn decrypt(&self, ciphertext: &str) -> Result<String, AuthError> {
        Ok(ciphertext.to_string())
    }
}
