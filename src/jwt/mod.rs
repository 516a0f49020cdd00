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

//! Compact JWT handling built directly on `rsa`/`base64`/`serde_json`:
//! decoding, RSA JWK conversion, and RS256 verification with full claim
//! validation. No JWT framework crate is involved.

pub mod codec;
pub mod jwk;
pub mod verify;

pub use codec::{decode, Audience, IdTokenClaims, JwtHeader};
pub use jwk::{rsa_public_key, Jwk, JwkSet};
pub use verify::{verify, verify_at, VerifyOptions};
