//! Access token signing and verification.
//!
//! Access tokens are compact JWS documents signed with the key ring's
//! current key. The `kid` header selects the verification key; there is no
//! fallback to other keys, so a token whose key was retired is rejected even
//! if another retained key would happen to verify it.

use crate::clock::Clock;
use crate::config::TokenConfig;
use crate::constants::metrics as metric_names;
use crate::error::{AuthError, Result};
use crate::keys::KeyRing;
use crate::state::{AccessToken, UserId};
use jsonwebtoken::{Header, Validation, decode, decode_header, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id, as a decimal string.
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Unique token id.
    pub jti: String,
}

/// Signs and verifies access tokens against a [`KeyRing`].
pub struct TokenIssuer {
    keys: Arc<KeyRing>,
    clock: Arc<dyn Clock>,
    config: TokenConfig,
}

impl TokenIssuer {
    /// Create an issuer over `keys`.
    #[must_use]
    pub fn new(keys: Arc<KeyRing>, clock: Arc<dyn Clock>, config: TokenConfig) -> Self {
        Self {
            keys,
            clock,
            config,
        }
    }

    /// Sign an access token for `user_id` with the current key.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NoActiveKey`] if the ring has no current key
    /// - [`AuthError::InternalError`] if encoding fails
    pub fn sign(&self, user_id: UserId) -> Result<AccessToken> {
        let Some(key) = self.keys.current()? else {
            tracing::error!(user_id = %user_id, "No active signing key");
            return Err(AuthError::NoActiveKey);
        };

        let now = self.clock.now();
        let expires_at = now + self.config.access_token_ttl;
        let claims = AccessClaims {
            sub: user_id.to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let mut header = Header::new(key.algorithm());
        header.kid = Some(key.kid().to_string());

        let token = encode(&header, &claims, key.encoding_key()).map_err(|e| {
            tracing::error!(kid = %key.kid(), error = %e, "Access token signing failed");
            AuthError::InternalError(format!("token signing failed: {e}"))
        })?;

        metrics::counter!(metric_names::TOKENS_SIGNED).increment(1);
        tracing::debug!(user_id = %user_id, kid = %key.kid(), "Access token signed");

        Ok(AccessToken {
            token,
            kid: key.kid().to_string(),
            expires_at,
        })
    }

    /// Verify `token` and return its subject.
    ///
    /// # Errors
    ///
    /// - [`AuthError::KeyNotFound`] if the `kid` is not retained
    /// - [`AuthError::InvalidToken`] for any format, signature, claim or
    ///   expiry failure
    pub fn verify(&self, token: &str) -> Result<UserId> {
        let claims = self.verify_claims(token)?;

        claims.sub.parse::<i64>().map(UserId).map_err(|_| {
            Self::reject("bad_subject", None);
            AuthError::invalid_token("subject is not a user id")
        })
    }

    /// Verify `token` and return all of its claims.
    ///
    /// # Errors
    ///
    /// Same as [`TokenIssuer::verify`].
    pub fn verify_claims(&self, token: &str) -> Result<AccessClaims> {
        let header = decode_header(token).map_err(|e| {
            Self::reject("malformed", None);
            AuthError::invalid_token(format!("unreadable header: {e}"))
        })?;

        let Some(kid) = header.kid else {
            Self::reject("missing_kid", None);
            return Err(AuthError::invalid_token("missing kid"));
        };

        let Some(key) = self.keys.get(&kid)? else {
            Self::reject("unknown_kid", Some(&kid));
            return Err(AuthError::KeyNotFound { kid });
        };

        let mut validation = Validation::new(key.algorithm());
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        // Expiry is checked below against the injected clock.
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<AccessClaims>(token, key.decoding_key(), &validation).map_err(|e| {
            Self::reject("invalid", Some(&kid));
            AuthError::invalid_token(format!("{:?}", e.kind()))
        })?;

        if self.clock.now().timestamp() >= data.claims.exp {
            Self::reject("expired", Some(&kid));
            return Err(AuthError::invalid_token("expired"));
        }

        Ok(data.claims)
    }

    /// Issuer configuration.
    #[must_use]
    pub const fn config(&self) -> &TokenConfig {
        &self.config
    }

    fn reject(reason: &'static str, kid: Option<&str>) {
        metrics::counter!(metric_names::TOKENS_REJECTED, "reason" => reason).increment(1);
        tracing::warn!(reason, kid = kid.unwrap_or("-"), "Access token rejected");
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("keys", &self.keys)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::KeyRingConfig;
    use crate::mocks::MockClock;
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    use chrono::Duration;

    fn issuer(clock: &MockClock) -> (TokenIssuer, Arc<KeyRing>) {
        let keys = Arc::new(KeyRing::new(KeyRingConfig::default(), Arc::new(clock.clone())).unwrap());
        let issuer = TokenIssuer::new(keys.clone(), Arc::new(clock.clone()), TokenConfig::default());
        (issuer, keys)
    }

    #[test]
    fn test_sign_and_verify() {
        let clock = MockClock::new();
        let (issuer, keys) = issuer(&clock);

        let access = issuer.sign(UserId(7)).unwrap();

        assert_eq!(access.kid, keys.current().unwrap().unwrap().kid());
        assert_eq!(access.expires_at, clock.now() + Duration::minutes(15));
        assert_eq!(issuer.verify(&access.token).unwrap(), UserId(7));

        let claims = issuer.verify_claims(&access.token).unwrap();
        assert_eq!(claims.iss, "credential-issuer");
        assert_eq!(claims.aud, "api");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_header_carries_kid() {
        let clock = MockClock::new();
        let (issuer, _) = issuer(&clock);
        let access = issuer.sign(UserId(1)).unwrap();

        let header = decode_header(&access.token).unwrap();

        assert_eq!(header.kid.as_deref(), Some(access.kid.as_str()));
        assert_eq!(header.alg, jsonwebtoken::Algorithm::RS256);
    }

    #[test]
    fn test_sign_without_key_is_no_active_key() {
        let clock = MockClock::new();
        let keys = Arc::new(KeyRing::empty(KeyRingConfig::default(), Arc::new(clock.clone())).unwrap());
        let issuer = TokenIssuer::new(keys, Arc::new(clock), TokenConfig::default());

        assert_eq!(issuer.sign(UserId(1)), Err(AuthError::NoActiveKey));
    }

    #[test]
    fn test_expired_token_rejected() {
        let clock = MockClock::new();
        let (issuer, _) = issuer(&clock);
        let access = issuer.sign(UserId(1)).unwrap();

        clock.advance(Duration::minutes(14));
        assert!(issuer.verify(&access.token).is_ok());

        clock.advance(Duration::minutes(1));
        assert!(matches!(
            issuer.verify(&access.token),
            Err(AuthError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let clock = MockClock::new();
        let (issuer, keys) = issuer(&clock);
        let access = issuer.sign(UserId(1)).unwrap();

        let other = TokenIssuer::new(
            keys,
            Arc::new(clock),
            TokenConfig::new("credential-issuer".to_string(), "billing".to_string()),
        );

        assert!(matches!(
            other.verify(&access.token),
            Err(AuthError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_garbage_and_missing_kid_rejected() {
        let clock = MockClock::new();
        let (issuer, _) = issuer(&clock);

        assert!(matches!(
            issuer.verify("not.a.jwt"),
            Err(AuthError::InvalidToken { .. })
        ));

        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"1"}"#);
        let no_kid = format!("{header}.{payload}.c2ln");

        assert_eq!(
            issuer.verify(&no_kid),
            Err(AuthError::invalid_token("missing kid"))
        );
    }
}
