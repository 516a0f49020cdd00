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

//! Process-wide JWKS cache, keyed by issuer.
//!
//! Provider clients pointing at the same issuer share one entry. On expiry
//! the next caller refetches and overwrites; a concurrent duplicate fetch is
//! harmless because the content is idempotent and last-write-wins.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::AuthError;
use crate::jwt::JwkSet;

/// How long a fetched key set counts as fresh (1 hour).
pub const JWKS_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone)]
struct CacheEntry {
    keys: JwkSet,
    fetched_at: i64,
}

impl CacheEntry {
    fn is_fresh(&self, now: i64) -> bool {
        now - self.fetched_at < JWKS_TTL_SECS
    }
}

/// Issuer-keyed JWKS cache shared across provider clients.
///
/// Time is passed in by the caller so tests control expiry; production
/// callers pass `Utc::now().timestamp()`.
#[derive(Debug)]
pub struct JwksCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    http: reqwest::Client,
}

impl JwksCache {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            http,
        }
    }

    /// Return the key set for `issuer`, fetching from `jwks_uri` when the
    /// cached entry is missing or stale. Stale entries are never returned.
    pub async fn get(&self, issuer: &str, jwks_uri: &str, now: i64) -> Result<JwkSet, AuthError> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(issuer) {
                if entry.is_fresh(now) {
                    tracing::debug!(issuer, "JWKS cache hit");
                    return Ok(entry.keys.clone());
                }
            }
        }

        let keys = self.fetch(issuer, jwks_uri).await?;

        self.entries.write().await.insert(
            issuer.to_string(),
            CacheEntry {
                keys: keys.clone(),
                fetched_at: now,
            },
        );

        Ok(keys)
    }

    /// Plant a key set directly (test seam; lets tests pick `fetched_at`).
    pub async fn insert(&self, issuer: &str, keys: JwkSet, fetched_at: i64) {
        self.entries
            .write()
            .await
            .insert(issuer.to_string(), CacheEntry { keys, fetched_at });
    }

    async fn fetch(&self, issuer: &str, jwks_uri: &str) -> Result<JwkSet, AuthError> {
        tracing::info!(issuer, jwks_uri, "fetching JWKS");

        let resp = self
            .http
            .get(jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::Internal(format!("JWKS fetch failed for {issuer}: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(AuthError::Internal(format!(
                "JWKS endpoint for {issuer} returned HTTP {status}"
            )));
        }

        resp.json::<JwkSet>()
            .await
            .map_err(|e| AuthError::Internal(format!("invalid JWKS for {issuer}: {e}")))
    }
}
