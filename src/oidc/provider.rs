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

//! Per-provider OIDC client: authorization URL construction, code exchange,
//! ID token verification, and userinfo lookup.

use std::sync::Arc;

use serde::Deserialize;
use url::Url;

use crate::error::AuthError;
use crate::jwt::{self, IdTokenClaims, VerifyOptions};

use super::discovery::DiscoveryClient;
use super::jwks_cache::JwksCache;

/// Scopes requested on every login.
const SCOPES: &str = "openid email profile";

/// Resolved provider configuration, plaintext in memory.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Provider name as it appears in routes and cookies (e.g. "okta").
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub issuer: String,
    pub redirect_uri: String,
}

/// Raw response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Response from the userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Client for one configured identity provider.
///
/// Owns a per-instance discovery cache; the JWKS cache is shared process-wide
/// and keyed by issuer, so two providers pointing at the same issuer reuse
/// each other's keys.
#[derive(Debug)]
pub struct ProviderClient {
    settings: ProviderSettings,
    http: reqwest::Client,
    discovery: DiscoveryClient,
    jwks: Arc<JwksCache>,
}

impl ProviderClient {
    pub fn new(settings: ProviderSettings, http: reqwest::Client, jwks: Arc<JwksCache>) -> Self {
        let discovery = DiscoveryClient::new(settings.issuer.clone(), http.clone());
        Self {
            settings,
            http,
            discovery,
            jwks,
        }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Build the authorization-endpoint URL for one login attempt.
    pub async fn authorization_url(&self, state: &str, nonce: &str) -> Result<String, AuthError> {
        let doc = self.discovery.discover().await?;
        let mut url = Url::parse(&doc.authorization_endpoint).map_err(|e| {
            AuthError::DiscoveryFailed {
                issuer: self.settings.issuer.clone(),
                detail: format!("bad authorization endpoint: {e}"),
            }
        })?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", &self.settings.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPES)
            .append_pair("state", state)
            .append_pair("nonce", nonce);

        Ok(url.to_string())
    }

    /// Exchange an authorization code for tokens at the token endpoint.
    ///
    /// Credentials go in an HTTP Basic header (`base64(client_id:secret)`).
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AuthError> {
        let doc = self.discovery.discover().await?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
        ];

        let resp = self
            .http
            .post(&doc.token_endpoint)
            .basic_auth(&self.settings.client_id, Some(&self.settings.client_secret))
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(
                provider = %self.settings.name,
                %status,
                "token exchange failed: {body}"
            );
            return Err(AuthError::TokenExchangeFailed(body));
        }

        resp.json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(format!("invalid token response: {e}")))
    }

    /// Verify an ID token against this provider's issuer, client id, and the
    /// nonce bound to the login attempt.
    pub async fn verify_id_token(
        &self,
        id_token: &str,
        nonce: Option<&str>,
    ) -> Result<IdTokenClaims, AuthError> {
        let doc = self.discovery.discover().await?;
        let now = chrono::Utc::now().timestamp();
        let keys = self
            .jwks
            .get(&self.settings.issuer, &doc.jwks_uri, now)
            .await?;

        jwt::verify_at(
            id_token,
            &keys,
            &VerifyOptions {
                issuer: self.settings.issuer.clone(),
                audience: self.settings.client_id.clone(),
                nonce: nonce.map(str::to_string),
            },
            now,
        )
    }

    /// Fetch the userinfo document with a Bearer access token.
    pub async fn user_info(&self, access_token: &str) -> Result<UserInfo, AuthError> {
        let doc = self.discovery.discover().await?;
        let endpoint = doc.userinfo_endpoint.ok_or(AuthError::UserInfoUnavailable)?;

        let resp = self
            .http
            .get(&endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::UserInfoFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::UserInfoFailed(format!("HTTP {status}: {body}")));
        }

        resp.json::<UserInfo>()
            .await
            .map_err(|e| AuthError::UserInfoFailed(format!("invalid userinfo response: {e}")))
    }

    /// The callback path: exchange the code, then verify the returned ID
    /// token. The primary entry point for the callback protocol.
    pub async fn handle_callback(
        &self,
        code: &str,
        nonce: &str,
    ) -> Result<(TokenResponse, IdTokenClaims), AuthError> {
        let tokens = self.exchange_code(code).await?;
        let id_token = tokens
            .id_token
            .as_deref()
            .ok_or_else(|| AuthError::TokenExchangeFailed("response missing id_token".into()))?;
        let claims = self.verify_id_token(id_token, Some(nonce)).await?;
        Ok((tokens, claims))
    }
}
