//! End-to-end session lifecycle against the in-memory session store.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use clinvault_auth::claims::{ClaimsIdentity, ClaimsPrincipal};
use clinvault_auth::error::AuthError;
use clinvault_auth::{
    DataSigner, SessionConfig, SessionProvider, SessionRecord, SessionStorage, SignedToken,
    SigningConfig,
};
use clinvault_auth_memory::MemorySessionStorage;

struct Harness {
    provider: SessionProvider,
    storage: Arc<MemorySessionStorage>,
    signer: Arc<DataSigner>,
}

fn harness() -> Harness {
    let signer = Arc::new(
        DataSigner::from_config(&SigningConfig::Hmac {
            secret: Some("lifecycle test secret".to_string()),
            key_base64: None,
        })
        .unwrap(),
    );
    let storage = Arc::new(MemorySessionStorage::new());
    let provider = SessionProvider::new(
        storage.clone(),
        signer.clone(),
        &SessionConfig::default(),
    )
    .unwrap();
    Harness {
        provider,
        storage,
        signer,
    }
}

fn principal() -> ClaimsPrincipal {
    let mut principal = ClaimsPrincipal::new(ClaimsIdentity::user(Uuid::new_v4(), "jdoe", true));
    principal
        .add_identity(ClaimsIdentity::application(Uuid::new_v4(), "fiddler-ehr", true))
        .unwrap();
    principal
}

#[tokio::test]
async fn test_establish_get_extend_roundtrip() {
    let harness = harness();
    let expiry = OffsetDateTime::now_utc() + Duration::minutes(30);

    let session = harness
        .provider
        .establish(&principal(), expiry, "http://clinvault.test")
        .await
        .unwrap();
    assert!(session.refresh_token.is_some());

    let record = harness.provider.get(&session.token).await.unwrap();
    assert_eq!(record.audience, "http://clinvault.test");
    assert!(record.user_key.is_some());

    let refresh = session.refresh_token.clone().unwrap();
    let extended = harness.provider.extend(&refresh).await.unwrap();
    assert_ne!(extended.token, session.token);

    // The replacement carries a fresh single-use refresh credential.
    let refresh2 = extended.refresh_token.clone().unwrap();
    assert_ne!(refresh2, refresh);
    harness.provider.extend(&refresh2).await.unwrap();
}

#[tokio::test]
async fn test_extend_preserves_original_validity_duration() {
    let harness = harness();
    let expiry = OffsetDateTime::now_utc() + Duration::minutes(30);

    let session = harness
        .provider
        .establish(&principal(), expiry, "http://clinvault.test")
        .await
        .unwrap();
    let original_duration = session.not_after - session.not_before;

    let extended = harness
        .provider
        .extend(&session.refresh_token.unwrap())
        .await
        .unwrap();
    assert_eq!(extended.not_after - extended.not_before, original_duration);
    assert!(extended.not_after >= session.not_after);
}

#[tokio::test]
async fn test_old_session_survives_extension_but_refresh_is_single_use() {
    let harness = harness();
    let expiry = OffsetDateTime::now_utc() + Duration::minutes(30);

    let session = harness
        .provider
        .establish(&principal(), expiry, "http://clinvault.test")
        .await
        .unwrap();
    let refresh = session.refresh_token.clone().unwrap();

    harness.provider.extend(&refresh).await.unwrap();

    // The old session token keeps resolving until its own expiry.
    assert!(harness.provider.get(&session.token).await.is_ok());

    // Redeeming the consumed refresh token reports not-found, not tampering.
    let err = harness.provider.extend(&refresh).await.unwrap_err();
    assert!(matches!(err, AuthError::SessionNotFound));
}

#[tokio::test]
async fn test_tampered_tokens_fail_as_integrity_errors() {
    let harness = harness();
    let expiry = OffsetDateTime::now_utc() + Duration::minutes(30);

    let session = harness
        .provider
        .establish(&principal(), expiry, "http://clinvault.test")
        .await
        .unwrap();

    let mut token = session.token.clone();
    token[0] ^= 0x01;
    assert!(harness.provider.get(&token).await.unwrap_err().is_integrity_error());

    let mut refresh = session.refresh_token.unwrap();
    let last = refresh.len() - 1;
    refresh[last] ^= 0x80;
    assert!(
        harness
            .provider
            .extend(&refresh)
            .await
            .unwrap_err()
            .is_integrity_error()
    );
}

#[tokio::test]
async fn test_expired_session_is_not_found() {
    let harness = harness();

    // An expiry in the past yields a session that is already dead.
    let session = harness
        .provider
        .establish(
            &principal(),
            OffsetDateTime::now_utc() - Duration::seconds(5),
            "http://clinvault.test",
        )
        .await
        .unwrap();

    let err = harness.provider.get(&session.token).await.unwrap_err();
    assert!(matches!(err, AuthError::SessionNotFound));
}

#[tokio::test]
async fn test_refresh_redeemable_during_grace_after_expiry() {
    let harness = harness();
    let now = OffsetDateTime::now_utc();

    // Session expired two minutes ago; the ten-minute grace window is open.
    let refresh_id = [3u8; 16];
    let record = SessionRecord {
        session_key: Uuid::new_v4(),
        application_key: Uuid::new_v4(),
        user_key: Some(Uuid::new_v4()),
        audience: "http://clinvault.test".to_string(),
        not_before: now - Duration::minutes(62),
        not_after: now - Duration::minutes(2),
        refresh_expiration: now + Duration::minutes(8),
        refresh_token: Some(hex::encode(refresh_id)),
    };
    harness.storage.create(&record).await.unwrap();

    let refresh_token = SignedToken::seal(refresh_id, &harness.signer).unwrap();
    let extended = harness.provider.extend(&refresh_token).await.unwrap();

    // The replacement is live now and keeps the one-hour duration.
    assert!(harness.provider.get(&extended.token).await.is_ok());
    assert_eq!(extended.not_after - extended.not_before, Duration::minutes(60));
}

#[tokio::test]
async fn test_abandon_and_purge() {
    let harness = harness();
    let now = OffsetDateTime::now_utc();

    let session = harness
        .provider
        .establish(
            &principal(),
            now + Duration::minutes(30),
            "http://clinvault.test",
        )
        .await
        .unwrap();

    // A fully dead row for the purge to collect.
    let dead = SessionRecord {
        session_key: Uuid::new_v4(),
        application_key: Uuid::new_v4(),
        user_key: None,
        audience: "http://clinvault.test".to_string(),
        not_before: now - Duration::hours(3),
        not_after: now - Duration::hours(2),
        refresh_expiration: now - Duration::hours(1),
        refresh_token: None,
    };
    harness.storage.create(&dead).await.unwrap();

    assert_eq!(harness.provider.purge_expired().await.unwrap(), 1);

    harness.provider.abandon(&session.token).await.unwrap();
    assert!(harness.storage.is_empty());
}
