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

//! Application configuration loaded from environment variables.

use std::collections::HashMap;
use std::env;

/// Default bound on every outbound HTTP call (discovery, token exchange,
/// JWKS, userinfo). A slow provider may not hang a handshake forever.
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Configuration for the SSO API service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server (e.g. "0.0.0.0:8082").
    pub listen_addr: String,
    /// Login page users land on after a rejected handshake.
    pub login_url: String,
    /// Where a completed login redirects.
    pub after_login_url: String,
    /// Cookie domain (optional, e.g. ".example.com").
    pub cookie_domain: Option<String>,
    /// Whether cookies carry the `Secure` attribute.
    pub cookie_secure: bool,
    /// Per-call timeout for outbound provider HTTP requests, in seconds.
    pub http_timeout_secs: u64,
    /// Globally configured providers, keyed by name. Only complete entries
    /// appear here; a provider with missing credentials is simply not
    /// configured.
    pub providers: HashMap<String, GlobalProviderConfig>,
}

/// Global (environment-driven) configuration for one identity provider.
#[derive(Debug, Clone)]
pub struct GlobalProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub issuer: String,
    pub redirect_uri: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Optional
    /// - `LISTEN_ADDR` (default: `"0.0.0.0:8082"`)
    /// - `LOGIN_URL` (default: `"/login"`), `AFTER_LOGIN_URL` (default `"/"`)
    /// - `COOKIE_DOMAIN`, `COOKIE_SECURE` (default `"true"`)
    /// - `SSO_HTTP_TIMEOUT_SECS` (default `"10"`)
    /// - `SSO_PROVIDERS` (comma list, default `"okta,google"`), then per
    ///   provider `SSO_{NAME}_CLIENT_ID`, `SSO_{NAME}_CLIENT_SECRET`,
    ///   `SSO_{NAME}_ISSUER`, `SSO_{NAME}_REDIRECT_URI`. Entries with any
    ///   variable missing are skipped with a warning.
    pub fn from_env() -> Result<Self, String> {
        let listen_addr = env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8082".to_string());
        let login_url = env::var("LOGIN_URL").unwrap_or_else(|_| "/login".to_string());
        let after_login_url = env::var("AFTER_LOGIN_URL").unwrap_or_else(|_| "/".to_string());
        let cookie_domain = env::var("COOKIE_DOMAIN").ok().filter(|s| !s.is_empty());
        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| v != "false")
            .unwrap_or(true);
        let http_timeout_secs = env::var("SSO_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_HTTP_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "SSO_HTTP_TIMEOUT_SECS must be a valid integer")?;

        let names = env::var("SSO_PROVIDERS").unwrap_or_else(|_| "okta,google".to_string());
        let mut providers = HashMap::new();
        for name in names.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match Self::provider_from_env(name) {
                Some(cfg) => {
                    providers.insert(name.to_string(), cfg);
                }
                None => {
                    tracing::warn!(provider = name, "incomplete SSO provider config, skipping");
                }
            }
        }

        Ok(Self {
            listen_addr,
            login_url,
            after_login_url,
            cookie_domain,
            cookie_secure,
            http_timeout_secs,
            providers,
        })
    }

    fn provider_from_env(name: &str) -> Option<GlobalProviderConfig> {
        let upper = name.to_uppercase().replace('-', "_");
        let var = |suffix: &str| {
            env::var(format!("SSO_{upper}_{suffix}"))
                .ok()
                .filter(|s| !s.is_empty())
        };
        Some(GlobalProviderConfig {
            client_id: var("CLIENT_ID")?,
            client_secret: var("CLIENT_SECRET")?,
            issuer: var("ISSUER")?,
            redirect_uri: var("REDIRECT_URI")?,
        })
    }

    /// Build the shared outbound HTTP client with the bounded timeout.
    pub fn http_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.http_timeout_secs))
            .build()
            .expect("failed to build HTTP client")
    }
}
