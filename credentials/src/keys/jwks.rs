//! JSON Web Key Set document.

use super::der::{DerError, parse_public_key_components};
use crate::constants::jwk::{KEY_TYPE_RSA, USE_SIGNATURE};
use serde::{Deserialize, Serialize};

/// Published set of verification keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwks {
    /// One entry per retained signing key.
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Find a key by `kid`.
    #[must_use]
    pub fn find_by_kid(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }

    /// Key ids in publication order.
    #[must_use]
    pub fn kids(&self) -> Vec<&str> {
        self.keys.iter().map(|k| k.kid.as_str()).collect()
    }
}

/// A single RSA signature key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    /// Key type, always `RSA`.
    pub kty: String,
    /// Intended use, always `sig`.
    #[serde(rename = "use")]
    pub key_use: String,
    /// Key id, matches the `kid` header of tokens signed with this key.
    pub kid: String,
    /// JWS algorithm.
    pub alg: String,
    /// Modulus, base64url without padding.
    pub n: String,
    /// Public exponent, base64url without padding.
    pub e: String,
}

impl Jwk {
    /// Build a JWK from a DER encoded `SubjectPublicKeyInfo`.
    ///
    /// # Errors
    ///
    /// Returns [`DerError`] if the public key cannot be parsed.
    pub fn from_spki_der(
        kid: impl Into<String>,
        alg: impl Into<String>,
        spki: &[u8],
    ) -> Result<Self, DerError> {
        let components = parse_public_key_components(spki)?;

        Ok(Self {
            kty: KEY_TYPE_RSA.to_string(),
            key_use: USE_SIGNATURE.to_string(),
            kid: kid.into(),
            alg: alg.into(),
            n: components.modulus_b64url(),
            e: components.exponent_b64url(),
        })
    }
}
