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

//! Authentication error taxonomy.
//!
//! Every failure in the SSO core is one of these variants. Handlers log the
//! variant (with operator-useful detail) server-side and show the user a
//! generic message, never confirming or denying that an account exists.

use thiserror::Error;

/// Errors produced by the SSO core: JWT verification, OIDC flow, provider
/// resolution, and the callback protocol.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token is not three base64url segments of JSON.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Token header declares an algorithm other than RS256.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// No JWK in the fetched key set matches the token's `kid`.
    #[error("signing key not found (kid: {kid:?})")]
    KeyNotFound { kid: Option<String> },

    /// JWK `kty` is not RSA.
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// JWK is missing `n`/`e` or they do not decode to a usable key.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("signature verification failed")]
    InvalidSignature,

    #[error("token expired (exp: {exp})")]
    TokenExpired { exp: i64 },

    #[error("token issued in the future (iat: {iat})")]
    TokenNotYetValid { iat: i64 },

    #[error("issuer mismatch (expected {expected}, got {actual})")]
    InvalidIssuer { expected: String, actual: String },

    #[error("audience mismatch (expected {expected})")]
    InvalidAudience { expected: String },

    #[error("nonce mismatch")]
    InvalidNonce,

    /// `.well-known/openid-configuration` fetch failed.
    #[error("OIDC discovery failed for {issuer}: {detail}")]
    DiscoveryFailed { issuer: String, detail: String },

    /// Token endpoint returned non-2xx; carries the response body.
    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// Provider's discovery document has no userinfo endpoint.
    #[error("userinfo endpoint not available")]
    UserInfoUnavailable,

    #[error("userinfo request failed: {0}")]
    UserInfoFailed(String),

    /// Distinct caller-visible condition, not a verification failure.
    #[error("provider {0} is not configured")]
    ProviderNotConfigured(String),

    /// The identity provider sent `error=` back to the callback.
    #[error("provider rejected the login: {0}")]
    ProviderDenied(String),

    #[error("state parameter does not match the state cookie")]
    CsrfStateMismatch,

    #[error("nonce cookie missing from the callback")]
    MissingNonce,

    #[error("authorization code missing from the callback")]
    MissingCode,

    /// The verified ID token carries no usable email or subject.
    #[error("identity assertion has no email")]
    MissingEmail,

    /// The team bound to the handshake does not own the email's domain.
    #[error("team does not own the authenticated email domain")]
    InvalidTeamAssociation,

    /// The account is already linked to a different provider or subject.
    /// Identities are never silently reassigned.
    #[error("account is linked to a different identity provider")]
    AccountProviderMismatch,

    /// Collaborator (store/cipher/session) or I/O failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable snake_case label for structured logs and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            AuthError::KeyNotFound { .. } => "key_not_found",
            AuthError::UnsupportedKeyType(_) => "unsupported_key_type",
            AuthError::InvalidKey(_) => "invalid_key",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired { .. } => "token_expired",
            AuthError::TokenNotYetValid { .. } => "token_not_yet_valid",
            AuthError::InvalidIssuer { .. } => "invalid_issuer",
            AuthError::InvalidAudience { .. } => "invalid_audience",
            AuthError::InvalidNonce => "invalid_nonce",
            AuthError::DiscoveryFailed { .. } => "discovery_failed",
            AuthError::TokenExchangeFailed(_) => "token_exchange_failed",
            AuthError::UserInfoUnavailable => "user_info_unavailable",
            AuthError::UserInfoFailed(_) => "user_info_failed",
            AuthError::ProviderNotConfigured(_) => "provider_not_configured",
            AuthError::ProviderDenied(_) => "provider_denied",
            AuthError::CsrfStateMismatch => "csrf_state_mismatch",
            AuthError::MissingNonce => "missing_nonce",
            AuthError::MissingCode => "missing_code",
            AuthError::MissingEmail => "missing_email",
            AuthError::InvalidTeamAssociation => "invalid_team_association",
            AuthError::AccountProviderMismatch => "account_provider_mismatch",
            AuthError::Internal(_) => "internal",
        }
    }
}
