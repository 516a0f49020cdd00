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

//! RSA JWK → verifier public key conversion.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// A single JWK as published by the provider's JWKS endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default)]
    pub kid: Option<String>,
    /// RSA modulus, base64url.
    #[serde(default)]
    pub n: Option<String>,
    /// RSA public exponent, base64url.
    #[serde(default)]
    pub e: Option<String>,
}

/// A JSON Web Key Set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Find a key by `kid`.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }
}

fn decode_component(value: &str, what: &str) -> Result<BigUint, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| AuthError::InvalidKey(format!("{what} is not base64url: {e}")))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

/// Convert an RSA JWK into an [`RsaPublicKey`] usable for RS256 verification.
///
/// Only `kty = "RSA"` is supported; both `n` and `e` are required.
pub fn rsa_public_key(jwk: &Jwk) -> Result<RsaPublicKey, AuthError> {
    if jwk.kty != "RSA" {
        return Err(AuthError::UnsupportedKeyType(jwk.kty.clone()));
    }

    let n = jwk
        .n
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::InvalidKey("missing modulus (n)".into()))?;
    let e = jwk
        .e
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::InvalidKey("missing exponent (e)".into()))?;

    let n = decode_component(n, "modulus")?;
    let e = decode_component(e, "exponent")?;

    RsaPublicKey::new(n, e).map_err(|err| AuthError::InvalidKey(err.to_string()))
}
