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

//! OIDC discovery: fetching and caching `.well-known/openid-configuration`.

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::AuthError;

/// Endpoints published in a provider's discovery document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
}

/// Fetches a provider's discovery document and caches it for the lifetime
/// of the instance. Endpoints are assumed stable, so there is no TTL;
/// repeated calls after the first are cache hits.
#[derive(Debug)]
pub struct DiscoveryClient {
    issuer: String,
    http: reqwest::Client,
    cached: RwLock<Option<DiscoveryDocument>>,
}

impl DiscoveryClient {
    pub fn new(issuer: String, http: reqwest::Client) -> Self {
        Self {
            issuer,
            http,
            cached: RwLock::new(None),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Return the discovery document, fetching it on first use.
    pub async fn discover(&self) -> Result<DiscoveryDocument, AuthError> {
        {
            let cached = self.cached.read().await;
            if let Some(doc) = cached.as_ref() {
                return Ok(doc.clone());
            }
        }

        let doc = self.fetch().await?;

        // Concurrent first calls may both fetch; content is idempotent and
        // last-write-wins.
        *self.cached.write().await = Some(doc.clone());
        Ok(doc)
    }

    async fn fetch(&self) -> Result<DiscoveryDocument, AuthError> {
        let url = format!(
            "{}/.well-known/openid-configuration",
            self.issuer.trim_end_matches('/')
        );
        tracing::debug!(issuer = %self.issuer, "fetching OIDC discovery document");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AuthError::DiscoveryFailed {
                issuer: self.issuer.clone(),
                detail: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(AuthError::DiscoveryFailed {
                issuer: self.issuer.clone(),
                detail: format!(
                    "HTTP {status}: {}",
                    status.canonical_reason().unwrap_or("unknown")
                ),
            });
        }

        resp.json::<DiscoveryDocument>()
            .await
            .map_err(|e| AuthError::DiscoveryFailed {
                issuer: self.issuer.clone(),
                detail: format!("invalid discovery document: {e}"),
            })
    }
}
