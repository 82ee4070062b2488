//! Signing key ring.
//!
//! The ring owns every RSA key pair the process has generated and not yet
//! retired. Exactly one of them is current and signs new access tokens. The
//! others stay available for verification until [`KeyRing::cleanup`] retires
//! them by age.
//!
//! The key map and the current pointer live under one [`RwLock`], so a
//! reader never observes a current kid that is missing from the map.

pub mod der;
pub mod jwks;

use crate::clock::Clock;
use crate::config::KeyRingConfig;
use crate::constants::{KID_BYTES, MIN_RSA_KEY_BITS, metrics as metric_names};
use crate::error::{AuthError, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use jwks::{Jwk, Jwks};
use rand::RngCore;
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::EncodePublicKey;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// JWS name of an RSA signing algorithm, or `None` for any other family.
#[must_use]
pub const fn rsa_algorithm_name(algorithm: Algorithm) -> Option<&'static str> {
    match algorithm {
        Algorithm::RS256 => Some("RS256"),
        Algorithm::RS384 => Some("RS384"),
        Algorithm::RS512 => Some("RS512"),
        Algorithm::PS256 => Some("PS256"),
        Algorithm::PS384 => Some("PS384"),
        Algorithm::PS512 => Some("PS512"),
        _ => None,
    }
}

/// An RSA signing key pair addressed by `kid`.
pub struct KeyPair {
    kid: String,
    algorithm: Algorithm,
    created_at: DateTime<Utc>,
    public_key_der: Vec<u8>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl KeyPair {
    /// Generate a fresh key pair with a random kid.
    ///
    /// CPU heavy. Async callers should run this on a blocking thread.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyGeneration`] if RSA generation or encoding fails.
    pub fn generate(bits: usize, algorithm: Algorithm, created_at: DateTime<Utc>) -> Result<Self> {
        let private_key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| AuthError::KeyGeneration(format!("RSA generation failed: {e}")))?;

        let public_key_der = private_key
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| AuthError::KeyGeneration(format!("public key encoding failed: {e}")))?
            .as_bytes()
            .to_vec();

        let private_key_der = private_key
            .to_pkcs1_der()
            .map_err(|e| AuthError::KeyGeneration(format!("private key encoding failed: {e}")))?;
        let encoding_key = EncodingKey::from_rsa_der(private_key_der.as_bytes());

        // The verifying key is rebuilt from the published components, so a
        // key that verifies locally is exactly the key in the JWKS.
        let components = der::parse_public_key_components(&public_key_der)
            .map_err(|e| AuthError::KeyGeneration(format!("public key parse failed: {e}")))?;
        let decoding_key = DecodingKey::from_rsa_components(
            &components.modulus_b64url(),
            &components.exponent_b64url(),
        )
        .map_err(|e| AuthError::KeyGeneration(format!("decoding key failed: {e}")))?;

        Ok(Self {
            kid: generate_kid(),
            algorithm,
            created_at,
            public_key_der,
            encoding_key,
            decoding_key,
        })
    }

    /// Key id.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Signing algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Generation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Public key as DER `SubjectPublicKeyInfo`.
    #[must_use]
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// Private signing key.
    #[must_use]
    pub const fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Public verification key.
    #[must_use]
    pub const fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Public half of this key as a JWK.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalError`] if the stored public key does not
    /// parse.
    pub fn to_jwk(&self) -> Result<Jwk> {
        let alg = rsa_algorithm_name(self.algorithm).ok_or_else(|| {
            AuthError::InternalError(format!("non-RSA algorithm on key {}", self.kid))
        })?;

        Jwk::from_spki_der(self.kid.clone(), alg, &self.public_key_der).map_err(|e| {
            AuthError::InternalError(format!("stored public key {} unreadable: {e}", self.kid))
        })
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

fn generate_kid() -> String {
    let mut bytes = [0u8; KID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Default)]
struct KeyRingState {
    keys: HashMap<String, Arc<KeyPair>>,
    current: Option<String>,
}

/// Retained signing keys plus the current-key pointer.
pub struct KeyRing {
    config: KeyRingConfig,
    clock: Arc<dyn Clock>,
    state: RwLock<KeyRingState>,
}

impl KeyRing {
    /// Create a ring and generate its first key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyGeneration`] if the configuration is rejected
    /// or the first key cannot be generated.
    pub fn new(config: KeyRingConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let ring = Self::empty(config, clock)?;
        ring.generate()?;
        Ok(ring)
    }

    /// Create a ring with no keys. [`KeyRing::current`] returns `None` until
    /// [`KeyRing::generate`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyGeneration`] if the key size is below 2048
    /// bits or the algorithm is not an RSA algorithm.
    pub fn empty(config: KeyRingConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        if config.key_bits < MIN_RSA_KEY_BITS {
            return Err(AuthError::KeyGeneration(format!(
                "RSA key size {} is below the {MIN_RSA_KEY_BITS}-bit minimum",
                config.key_bits
            )));
        }
        if rsa_algorithm_name(config.algorithm).is_none() {
            return Err(AuthError::KeyGeneration(format!(
                "{:?} is not an RSA signing algorithm",
                config.algorithm
            )));
        }

        Ok(Self {
            config,
            clock,
            state: RwLock::new(KeyRingState::default()),
        })
    }

    /// Generate a key pair, insert it and make it current.
    ///
    /// Generation happens before the lock is taken; the insert and the
    /// pointer swap happen under one write guard.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyGeneration`] on generation failure.
    pub fn generate(&self) -> Result<String> {
        let key = KeyPair::generate(self.config.key_bits, self.config.algorithm, self.clock.now())?;
        let kid = key.kid.clone();

        {
            let mut state = self
                .state
                .write()
                .map_err(|_| AuthError::lock_poisoned("key ring"))?;
            state.keys.insert(kid.clone(), Arc::new(key));
            state.current = Some(kid.clone());
        }

        metrics::counter!(metric_names::KEYS_GENERATED).increment(1);
        tracing::debug!(kid = %kid, bits = self.config.key_bits, "Signing key generated");

        Ok(kid)
    }

    /// Generate a new current key. The previous key stays available for
    /// verification.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyGeneration`] on generation failure.
    pub fn rotate(&self) -> Result<String> {
        let previous = self.current()?.map(|key| key.kid.clone());
        let kid = self.generate()?;

        tracing::info!(
            new_kid = %kid,
            previous_kid = previous.as_deref().unwrap_or("none"),
            "Signing key rotated"
        );

        Ok(kid)
    }

    /// The key that signs new tokens.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalError`] if the lock is poisoned.
    pub fn current(&self) -> Result<Option<Arc<KeyPair>>> {
        let state = self
            .state
            .read()
            .map_err(|_| AuthError::lock_poisoned("key ring"))?;

        Ok(state
            .current
            .as_ref()
            .and_then(|kid| state.keys.get(kid))
            .cloned())
    }

    /// Look up a retained key by kid.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalError`] if the lock is poisoned.
    pub fn get(&self, kid: &str) -> Result<Option<Arc<KeyPair>>> {
        let state = self
            .state
            .read()
            .map_err(|_| AuthError::lock_poisoned("key ring"))?;

        Ok(state.keys.get(kid).cloned())
    }

    /// Number of retained keys.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalError`] if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        let state = self
            .state
            .read()
            .map_err(|_| AuthError::lock_poisoned("key ring"))?;

        Ok(state.keys.len())
    }

    /// Returns `true` before the first key is generated.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalError`] if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// Retire every non-current key created more than `max_age_days` ago.
    ///
    /// Returns the retired kids. Tokens signed with them stop verifying.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalError`] if the lock is poisoned.
    pub fn cleanup(&self, max_age_days: u32) -> Result<Vec<String>> {
        // An age reaching past the earliest representable instant matches no key.
        let Some(cutoff) = Duration::try_days(i64::from(max_age_days))
            .and_then(|age| self.clock.now().checked_sub_signed(age))
        else {
            tracing::debug!(max_age_days, "Cleanup cutoff out of range, nothing retired");
            return Ok(Vec::new());
        };

        let mut retired = {
            let mut state = self
                .state
                .write()
                .map_err(|_| AuthError::lock_poisoned("key ring"))?;
            let current = state.current.clone();

            let retired: Vec<String> = state
                .keys
                .values()
                .filter(|key| key.created_at < cutoff && current.as_deref() != Some(key.kid()))
                .map(|key| key.kid.clone())
                .collect();
            for kid in &retired {
                state.keys.remove(kid);
            }
            retired
        };
        retired.sort();

        if !retired.is_empty() {
            metrics::counter!(metric_names::KEYS_RETIRED).increment(retired.len() as u64);
            tracing::info!(retired = ?retired, max_age_days, "Signing keys retired");
        }

        Ok(retired)
    }

    /// Public halves of every retained key, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalError`] if the lock is poisoned or a
    /// stored public key cannot be parsed.
    pub fn export_jwks(&self) -> Result<Jwks> {
        let mut keys: Vec<Arc<KeyPair>> = {
            let state = self
                .state
                .read()
                .map_err(|_| AuthError::lock_poisoned("key ring"))?;
            state.keys.values().cloned().collect()
        };
        keys.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.kid.cmp(&b.kid))
        });

        let keys = keys
            .iter()
            .map(|key| key.to_jwk())
            .collect::<Result<Vec<_>>>()?;

        Ok(Jwks { keys })
    }

    /// Ring configuration.
    #[must_use]
    pub const fn config(&self) -> &KeyRingConfig {
        &self.config
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRing")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
