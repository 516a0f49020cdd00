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

//! RS256 ID token verification with full claim validation.
//!
//! Checks run in a fixed order and a token is accepted only if every one
//! passes; there is no partial success. Timestamps allow 60 seconds of
//! clock skew in both directions.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::sha2::Sha256;
use rsa::signature::Verifier;

use crate::error::AuthError;

use super::codec::{decode, IdTokenClaims};
use super::jwk::{rsa_public_key, JwkSet};

/// Clock skew tolerance for `exp`/`iat`, in seconds.
pub const CLOCK_SKEW_SECS: i64 = 60;

/// Expectations a token must satisfy.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Exact expected `iss` value.
    pub issuer: String,
    /// Value that must appear in `aud` (string or list).
    pub audience: String,
    /// When set, the token's `nonce` claim must equal this value.
    pub nonce: Option<String>,
}

/// Verify a compact RS256 JWT against a key set, at the current time.
pub fn verify(
    token: &str,
    keys: &JwkSet,
    options: &VerifyOptions,
) -> Result<IdTokenClaims, AuthError> {
    verify_at(token, keys, options, chrono::Utc::now().timestamp())
}

/// Verify a compact RS256 JWT against a key set, as of `now` (Unix seconds).
///
/// The injected clock keeps the skew boundaries testable.
pub fn verify_at(
    token: &str,
    keys: &JwkSet,
    options: &VerifyOptions,
    now: i64,
) -> Result<IdTokenClaims, AuthError> {
    let (header, claims) = decode(token)?;

    if header.alg != "RS256" {
        return Err(AuthError::UnsupportedAlgorithm(header.alg));
    }

    let jwk = header
        .kid
        .as_deref()
        .and_then(|kid| keys.find(kid))
        .ok_or(AuthError::KeyNotFound {
            kid: header.kid.clone(),
        })?;

    let public_key = rsa_public_key(jwk)?;

    // Signature covers `base64url(header).base64url(payload)` exactly as
    // transmitted; decode() already guaranteed the three-segment shape.
    let parts: Vec<&str> = token.split('.').collect();
    let signing_input = format!("{}.{}", parts[0], parts[1]);
    let signature_bytes = URL_SAFE_NO_PAD
        .decode(parts[2])
        .map_err(|_| AuthError::InvalidSignature)?;
    let signature =
        Signature::try_from(signature_bytes.as_slice()).map_err(|_| AuthError::InvalidSignature)?;

    VerifyingKey::<Sha256>::new(public_key)
        .verify(signing_input.as_bytes(), &signature)
        .map_err(|_| AuthError::InvalidSignature)?;

    if claims.exp < now - CLOCK_SKEW_SECS {
        return Err(AuthError::TokenExpired { exp: claims.exp });
    }
    if claims.iat > now + CLOCK_SKEW_SECS {
        return Err(AuthError::TokenNotYetValid { iat: claims.iat });
    }
    if claims.iss != options.issuer {
        return Err(AuthError::InvalidIssuer {
            expected: options.issuer.clone(),
            actual: claims.iss,
        });
    }
    if !claims.aud.contains(&options.audience) {
        return Err(AuthError::InvalidAudience {
            expected: options.audience.clone(),
        });
    }
    if let Some(expected_nonce) = &options.nonce {
        if claims.nonce.as_ref() != Some(expected_nonce) {
            return Err(AuthError::InvalidNonce);
        }
    }

    Ok(claims)
}
