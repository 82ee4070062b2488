//! Security-focused integration tests.
//!
//! - Single use of verification tokens under concurrency
//! - Access tokens signed by retired or unknown keys
//! - Tampered tokens
//! - Session secret and expiry enforcement
//! - Challenge expiry, replay and guessing

#![allow(clippy::unwrap_used)]

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Duration;
use credential_issuer::mocks::{FixedCodeGenerator, MockClock, RecordingNotifier};
use credential_issuer::prelude::*;

type Service = CredentialService<InMemoryUserRepository, RecordingNotifier, InMemorySessionStore>;

fn service(clock: &MockClock) -> Arc<Service> {
    let users = Arc::new(InMemoryUserRepository::new());
    users.insert_user("user@example.com", UserId(7)).unwrap();

    Arc::new(
        CredentialService::builder(
            users,
            Arc::new(RecordingNotifier::new()),
            Arc::new(InMemorySessionStore::new()),
        )
        .with_clock(Arc::new(clock.clone()))
        .with_code_generator(Arc::new(FixedCodeGenerator::new("482193")))
        .build()
        .unwrap(),
    )
}

async fn verification_token(service: &Service) -> String {
    service.issue_challenge("user@example.com").await.unwrap();
    service
        .verify_challenge("user@example.com", "482193")
        .await
        .unwrap()
        .verification_token
}

async fn session(service: &Service) -> SessionGrant {
    let token = verification_token(service).await;
    service
        .create_session(UserId(7), "mySecret123", &token, DeviceInfo::default())
        .await
        .unwrap()
}

/// Two clients racing with the same verification token: exactly one
/// session is created.
#[tokio::test]
async fn test_concurrent_session_creation_with_one_token() {
    let clock = MockClock::new();
    let service = service(&clock);
    let token = verification_token(&service).await;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            let token = token.clone();
            tokio::spawn(async move {
                service
                    .create_session(UserId(7), "mySecret123", &token, DeviceInfo::default())
                    .await
                    .is_ok()
            })
        })
        .collect();

    let mut created = 0;
    for task in tasks {
        if task.await.unwrap() {
            created += 1;
        }
    }

    assert_eq!(created, 1);
}

/// A verification token is bound to the user it was issued to.
#[tokio::test]
async fn test_verification_token_for_another_user_rejected() {
    let clock = MockClock::new();
    let service = service(&clock);
    let token = verification_token(&service).await;

    let stolen = service
        .create_session(UserId(8), "mySecret123", &token, DeviceInfo::default())
        .await;
    assert_eq!(stolen.unwrap_err().public(), PublicError::InvalidVerification);

    // The mismatch burned the token for its real owner too.
    let owner = service
        .create_session(UserId(7), "mySecret123", &token, DeviceInfo::default())
        .await;
    assert!(owner.is_err());
}

#[tokio::test]
async fn test_verification_token_expires() {
    let clock = MockClock::new();
    let service = service(&clock);
    let token = verification_token(&service).await;

    clock.advance(Duration::minutes(16));

    let result = service
        .create_session(UserId(7), "mySecret123", &token, DeviceInfo::default())
        .await;
    assert_eq!(result.unwrap_err().public(), PublicError::InvalidVerification);
}

/// Once a rotated-out key is cleaned up its tokens stop verifying and the
/// key leaves the JWKS.
#[tokio::test]
async fn test_cleanup_revokes_tokens_of_retired_key() {
    let clock = MockClock::new();
    let service = service(&clock);
    let old = service.tokens().sign(UserId(7)).unwrap();

    let new_kid = service.rotate_keys().await.unwrap();
    assert_eq!(service.authenticate(&old.token).unwrap(), UserId(7));

    clock.advance(Duration::days(8));
    let retired = service.cleanup_keys(7).unwrap();

    assert_eq!(retired, vec![old.kid.clone()]);
    assert_eq!(
        service.authenticate(&old.token),
        Err(AuthError::KeyNotFound { kid: old.kid.clone() })
    );
    assert_eq!(service.jwks().unwrap().kids(), vec![new_kid.as_str()]);
}

/// Cleanup never removes the current key, however old.
#[tokio::test]
async fn test_cleanup_keeps_current_key() {
    let clock = MockClock::new();
    let service = service(&clock);

    clock.advance(Duration::days(365));

    assert!(service.cleanup_keys(0).unwrap().is_empty());
    assert!(service.tokens().sign(UserId(7)).is_ok());
}

/// A token whose header names a key we never issued.
#[tokio::test]
async fn test_forged_kid_rejected() {
    let clock = MockClock::new();
    let service = service(&clock);
    let access = service.tokens().sign(UserId(7)).unwrap();

    let mut parts = access.token.split('.');
    let _header = parts.next().unwrap();
    let payload = parts.next().unwrap();
    let signature = parts.next().unwrap();
    let forged_header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT","kid":"attacker"}"#);
    let forged = format!("{forged_header}.{payload}.{signature}");

    assert_eq!(
        service.authenticate(&forged),
        Err(AuthError::KeyNotFound {
            kid: "attacker".to_string()
        })
    );
}

/// Changing the subject invalidates the signature.
#[tokio::test]
async fn test_tampered_payload_rejected() {
    let clock = MockClock::new();
    let service = service(&clock);
    let access = service.tokens().sign(UserId(7)).unwrap();

    let parts: Vec<&str> = access.token.split('.').collect();
    let mut claims: serde_json::Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
    claims["sub"] = serde_json::Value::String("1".to_string());
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    let tampered = format!("{}.{payload}.{}", parts[0], parts[2]);

    let err = service.authenticate(&tampered).unwrap_err();
    assert_eq!(err.public(), PublicError::InvalidToken);
}

/// A token signed with a different key but claiming our kid.
#[tokio::test]
async fn test_signature_from_other_ring_rejected() {
    let clock = MockClock::new();
    let ours = service(&clock);
    let theirs = service(&clock);
    let foreign = theirs.tokens().sign(UserId(7)).unwrap();
    let our_kid = ours.keys().current().unwrap().unwrap().kid().to_string();

    let parts: Vec<&str> = foreign.token.split('.').collect();
    let header = URL_SAFE_NO_PAD.encode(format!(r#"{{"alg":"RS256","typ":"JWT","kid":"{our_kid}"}}"#));
    let spoofed = format!("{header}.{}.{}", parts[1], parts[2]);

    let err = ours.authenticate(&spoofed).unwrap_err();
    assert_eq!(err.public(), PublicError::InvalidToken);
}

#[tokio::test]
async fn test_refresh_requires_matching_secret() {
    let clock = MockClock::new();
    let service = service(&clock);
    let grant = session(&service).await;

    assert_eq!(
        service.refresh_session(&grant.refresh_token, "mySecret124").await,
        Err(AuthError::InvalidSecret)
    );
    assert!(
        service
            .refresh_session(&grant.refresh_token, "mySecret123")
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_refresh_after_session_expiry() {
    let clock = MockClock::new();
    let service = service(&clock);
    let grant = session(&service).await;

    clock.advance(Duration::days(30) + Duration::seconds(1));

    assert_eq!(
        service.refresh_session(&grant.refresh_token, "mySecret123").await,
        Err(AuthError::SessionExpired)
    );
}

#[tokio::test]
async fn test_challenge_expiry_and_replay() {
    let clock = MockClock::new();
    let service = service(&clock);

    service.issue_challenge("user@example.com").await.unwrap();
    clock.advance(Duration::minutes(11));
    assert_eq!(
        service.verify_challenge("user@example.com", "482193").await,
        Err(AuthError::ChallengeExpired)
    );
    // The expired code was cleared.
    assert_eq!(
        service.verify_challenge("user@example.com", "482193").await,
        Err(AuthError::InvalidChallenge)
    );

    service.issue_challenge("user@example.com").await.unwrap();
    assert!(service.verify_challenge("user@example.com", "482193").await.is_ok());
    assert_eq!(
        service.verify_challenge("user@example.com", "482193").await,
        Err(AuthError::InvalidChallenge)
    );
}

/// Wrong and missing codes look identical from outside.
#[tokio::test]
async fn test_challenge_failures_do_not_leak_identity_existence() {
    let clock = MockClock::new();
    let service = service(&clock);
    service.issue_challenge("user@example.com").await.unwrap();

    let wrong_code = service
        .verify_challenge("user@example.com", "000000")
        .await
        .unwrap_err();
    let unknown_user = service
        .verify_challenge("nobody@example.com", "000000")
        .await
        .unwrap_err();

    assert_eq!(wrong_code.public(), unknown_user.public());
    assert_eq!(wrong_code.public().message(), unknown_user.public().message());
}

/// A code gets one attempt: after a wrong guess even the right code fails.
#[tokio::test]
async fn test_wrong_guess_burns_the_code() {
    let clock = MockClock::new();
    let service = service(&clock);
    service.issue_challenge("user@example.com").await.unwrap();

    assert_eq!(
        service.verify_challenge("user@example.com", "000000").await,
        Err(AuthError::InvalidChallenge)
    );
    assert_eq!(
        service.verify_challenge("user@example.com", "482193").await,
        Err(AuthError::InvalidChallenge)
    );

    service.issue_challenge("user@example.com").await.unwrap();
    assert!(service.verify_challenge("user@example.com", "482193").await.is_ok());
}
