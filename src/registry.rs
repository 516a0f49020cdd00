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

//! Provider resolution: which [`ProviderClient`] serves a login attempt.
//!
//! Resolution is an explicit ordered list of resolvers: team-scoped
//! configuration first, then the global environment configuration, with the
//! first non-null answer winning. Constructed clients are cached for the
//! process lifetime, keyed `teamId:name` (team-scoped) or `name` (global).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::RwLock;

use crate::config::GlobalProviderConfig;
use crate::error::AuthError;
use crate::oidc::{JwksCache, ProviderClient, ProviderSettings};
use crate::store::{SecretCipher, TeamStore};

/// One step in the resolution order.
#[async_trait]
pub trait ProviderResolver: Send + Sync {
    /// Cache key this resolver's instances live under, or `None` when the
    /// resolver does not apply to the request at all.
    fn cache_key(&self, name: &str, team_id: Option<&str>) -> Option<String>;

    /// Produce settings for the provider, or `None` when this source has no
    /// applicable configuration ("not configured", which is not an error).
    async fn resolve(
        &self,
        name: &str,
        team_id: Option<&str>,
    ) -> Result<Option<ProviderSettings>, AuthError>;
}

/// Team-scoped configuration from the team store. Applies only when the
/// handshake is bound to a team; requires SSO enabled, a matching provider
/// name, and complete credentials (secret decrypted on the way out).
pub struct TeamConfigResolver {
    teams: Arc<dyn TeamStore>,
    cipher: Arc<dyn SecretCipher>,
}

impl TeamConfigResolver {
    pub fn new(teams: Arc<dyn TeamStore>, cipher: Arc<dyn SecretCipher>) -> Self {
        Self { teams, cipher }
    }
}

#[async_trait]
impl ProviderResolver for TeamConfigResolver {
    fn cache_key(&self, name: &str, team_id: Option<&str>) -> Option<String> {
        team_id.map(|tid| format!("{tid}:{name}"))
    }

    async fn resolve(
        &self,
        name: &str,
        team_id: Option<&str>,
    ) -> Result<Option<ProviderSettings>, AuthError> {
        let Some(team_id) = team_id else {
            return Ok(None);
        };
        let Some(config) = self.teams.find_sso_config(team_id).await? else {
            return Ok(None);
        };

        if !config.sso_enabled
            || config.provider != name
            || config.client_id.is_empty()
            || config.client_secret_ciphertext.is_empty()
            || config.issuer.is_empty()
            || config.redirect_uri.is_empty()
        {
            return Ok(None);
        }

        let client_secret = self.cipher.decrypt(&config.client_secret_ciphertext)?;
        Ok(Some(ProviderSettings {
            name: name.to_string(),
            client_id: config.client_id,
            client_secret,
            issuer: config.issuer,
            redirect_uri: config.redirect_uri,
        }))
    }
}

/// Global environment configuration. Only complete entries exist in the
/// table (see [`crate::config::Config::from_env`]).
pub struct GlobalConfigResolver {
    providers: HashMap<String, GlobalProviderConfig>,
}

impl GlobalConfigResolver {
    pub fn new(providers: HashMap<String, GlobalProviderConfig>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl ProviderResolver for GlobalConfigResolver {
    fn cache_key(&self, name: &str, _team_id: Option<&str>) -> Option<String> {
        Some(name.to_string())
    }

    async fn resolve(
        &self,
        name: &str,
        _team_id: Option<&str>,
    ) -> Result<Option<ProviderSettings>, AuthError> {
        Ok(self.providers.get(name).map(|cfg| ProviderSettings {
            name: name.to_string(),
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            issuer: cfg.issuer.clone(),
            redirect_uri: cfg.redirect_uri.clone(),
        }))
    }
}

/// Resolves and caches provider clients for the whole process.
pub struct ProviderRegistry {
    resolvers: Vec<Box<dyn ProviderResolver>>,
    instances: RwLock<HashMap<String, Arc<ProviderClient>>>,
    global: HashMap<String, GlobalProviderConfig>,
    teams: Arc<dyn TeamStore>,
    http: reqwest::Client,
    jwks: Arc<JwksCache>,
}

impl ProviderRegistry {
    pub fn new(
        global: HashMap<String, GlobalProviderConfig>,
        teams: Arc<dyn TeamStore>,
        cipher: Arc<dyn SecretCipher>,
        http: reqwest::Client,
        jwks: Arc<JwksCache>,
    ) -> Self {
        let resolvers: Vec<Box<dyn ProviderResolver>> = vec![
            Box::new(TeamConfigResolver::new(teams.clone(), cipher)),
            Box::new(GlobalConfigResolver::new(global.clone())),
        ];
        Self {
            resolvers,
            instances: RwLock::new(HashMap::new()),
            global,
            teams,
            http,
            jwks,
        }
    }

    /// Resolve the client for `name`, preferring team-scoped configuration
    /// when a team is bound. `Ok(None)` means "not configured".
    pub async fn get_provider(
        &self,
        name: &str,
        team_id: Option<&str>,
    ) -> Result<Option<Arc<ProviderClient>>, AuthError> {
        for resolver in &self.resolvers {
            let Some(key) = resolver.cache_key(name, team_id) else {
                continue;
            };

            if let Some(client) = self.instances.read().await.get(&key) {
                return Ok(Some(client.clone()));
            }

            if let Some(settings) = resolver.resolve(name, team_id).await? {
                let client = Arc::new(ProviderClient::new(
                    settings,
                    self.http.clone(),
                    self.jwks.clone(),
                ));
                self.instances
                    .write()
                    .await
                    .insert(key, client.clone());
                return Ok(Some(client));
            }
        }
        Ok(None)
    }

    /// Whether `name` has complete global configuration. Team-scoped
    /// configuration is deliberately not reflected here.
    pub fn is_provider_configured(&self, name: &str) -> bool {
        self.global.contains_key(name)
    }

    /// Names of globally configured providers, sorted for stable output.
    pub fn configured_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.global.keys().cloned().collect();
        names.sort();
        names
    }

    /// Route an email to the SSO-enabled team owning its domain.
    ///
    /// Malformed input yields `Ok(None)`, never an error: this is called
    /// with raw user input on the login path.
    pub async fn team_by_email_domain(
        &self,
        email: &str,
    ) -> Result<Option<(String, String)>, AuthError> {
        let Some(domain) = email_domain(email) else {
            return Ok(None);
        };
        Ok(self
            .teams
            .find_sso_team_by_domain(&domain)
            .await?
            .map(|team| (team.team_id, team.provider)))
    }
}

/// Extract the lowercase domain from a well-formed email address.
pub fn email_domain(email: &str) -> Option<String> {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex must compile")
    });
    if !re.is_match(email) {
        return None;
    }
    email.rsplit('@').next().map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, NoopCipher, TeamSsoConfig};

    fn global_config(issuer: &str) -> HashMap<String, GlobalProviderConfig> {
        let mut providers = HashMap::new();
        providers.insert(
            "okta".to_string(),
            GlobalProviderConfig {
                client_id: "global-client".to_string(),
                client_secret: "global-secret".to_string(),
                issuer: issuer.to_string(),
                redirect_uri: "https://app.example.com/callback/okta".to_string(),
            },
        );
        providers
    }

    fn team_config(team_id: &str, provider: &str, enabled: bool) -> TeamSsoConfig {
        TeamSsoConfig {
            team_id: team_id.to_string(),
            sso_enabled: enabled,
            provider: provider.to_string(),
            client_id: format!("{team_id}-client"),
            client_secret_ciphertext: format!("{team_id}-secret"),
            issuer: "https://team-idp.example.com".to_string(),
            redirect_uri: "https://app.example.com/callback/okta".to_string(),
            domains: vec!["corp.example.com".to_string()],
        }
    }

    fn registry(store: Arc<MemoryStore>, issuer: &str) -> ProviderRegistry {
        let http = reqwest::Client::new();
        ProviderRegistry::new(
            global_config(issuer),
            store,
            Arc::new(NoopCipher),
            http.clone(),
            Arc::new(JwksCache::new(http)),
        )
    }

    #[tokio::test]
    async fn global_provider_resolves_and_caches() {
        let registry = registry(MemoryStore::new(), "https://idp.example.com");

        let first = registry
            .get_provider("okta", None)
            .await
            .unwrap()
            .expect("globally configured");
        let second = registry.get_provider("okta", None).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.settings().client_id, "global-client");
    }

    #[tokio::test]
    async fn unknown_provider_is_none_not_error() {
        let registry = registry(MemoryStore::new(), "https://idp.example.com");
        assert!(registry.get_provider("github", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn team_config_takes_precedence_over_global() {
        let store = MemoryStore::new();
        store.insert_team(team_config("team-1", "okta", true)).await;
        let registry = registry(store, "https://idp.example.com");

        let client = registry
            .get_provider("okta", Some("team-1"))
            .await
            .unwrap()
            .expect("team configured");
        assert_eq!(client.settings().client_id, "team-1-client");

        // The global instance is cached independently.
        let global = registry.get_provider("okta", None).await.unwrap().unwrap();
        assert_eq!(global.settings().client_id, "global-client");
        assert!(!Arc::ptr_eq(&client, &global));
    }

    #[tokio::test]
    async fn team_without_config_falls_back_to_global() {
        let registry = registry(MemoryStore::new(), "https://idp.example.com");
        let client = registry
            .get_provider("okta", Some("team-no-sso"))
            .await
            .unwrap()
            .expect("global fallback");
        assert_eq!(client.settings().client_id, "global-client");
    }

    #[tokio::test]
    async fn disabled_or_mismatched_team_config_is_skipped() {
        let store = MemoryStore::new();
        store.insert_team(team_config("team-off", "okta", false)).await;
        store.insert_team(team_config("team-goog", "google", true)).await;
        let registry = registry(store, "https://idp.example.com");

        let client = registry
            .get_provider("okta", Some("team-off"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(client.settings().client_id, "global-client");

        // Provider name mismatch: team configured google, asked for okta.
        let client = registry
            .get_provider("okta", Some("team-goog"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(client.settings().client_id, "global-client");
    }

    #[tokio::test]
    async fn incomplete_team_creds_fall_through() {
        let store = MemoryStore::new();
        let mut config = team_config("team-1", "okta", true);
        config.client_secret_ciphertext = String::new();
        store.insert_team(config).await;
        let registry = registry(store, "https://idp.example.com");

        let client = registry
            .get_provider("okta", Some("team-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(client.settings().client_id, "global-client");
    }

    #[tokio::test]
    async fn team_secret_is_decrypted() {
        struct ReversingCipher;
        impl SecretCipher for ReversingCipher {
            fn decrypt(&self, ciphertext: &str) -> Result<String, AuthError> {
                Ok(ciphertext.chars().rev().collect())
            }
        }

        let store = MemoryStore::new();
        store.insert_team(team_config("team-1", "okta", true)).await;
        let http = reqwest::Client::new();
        let registry = ProviderRegistry::new(
            global_config("https://idp.example.com"),
            store,
            Arc::new(ReversingCipher),
            http.clone(),
            Arc::new(JwksCache::new(http)),
        );

        let client = registry
            .get_provider("okta", Some("team-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(client.settings().client_secret, "terces-1-maet");
    }

    #[tokio::test]
    async fn configured_providers_reflect_global_only() {
        let store = MemoryStore::new();
        store.insert_team(team_config("team-1", "google", true)).await;
        let registry = registry(store, "https://idp.example.com");

        assert!(registry.is_provider_configured("okta"));
        assert!(!registry.is_provider_configured("google"));
        assert_eq!(registry.configured_providers(), vec!["okta".to_string()]);
    }

    #[tokio::test]
    async fn email_domain_routing() {
        let store = MemoryStore::new();
        store.insert_team(team_config("team-1", "okta", true)).await;
        let registry = registry(store, "https://idp.example.com");

        let found = registry
            .team_by_email_domain("bob@corp.example.com")
            .await
            .unwrap()
            .expect("domain owned by team-1");
        assert_eq!(found, ("team-1".to_string(), "okta".to_string()));

        // Domain matching is case-insensitive on the input side.
        let found = registry
            .team_by_email_domain("bob@CORP.EXAMPLE.COM")
            .await
            .unwrap();
        assert!(found.is_some());

        assert!(registry
            .team_by_email_domain("bob@elsewhere.example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn malformed_email_is_none_never_error() {
        let registry = registry(MemoryStore::new(), "https://idp.example.com");
        for email in ["", "nodomain", "@corp.example.com", "a@b", "a b@c.example.com", "a@@c.example.com"] {
            assert!(
                registry.team_by_email_domain(email).await.unwrap().is_none(),
                "email: {email:?}"
            );
        }
    }

    #[test]
    fn email_domain_extraction() {
        assert_eq!(
            email_domain("Bob@Corp.Example.COM").as_deref(),
            Some("corp.example.com")
        );
        assert_eq!(email_domain("not-an-email"), None);
        assert_eq!(email_domain("two@@ats.example.com"), None);
    }
}
