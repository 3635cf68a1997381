//! Session provider.

use std::sync::Arc;

use rand::RngCore;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::claims::{ClaimsPrincipal, types};
use crate::config::SessionConfig;
use crate::error::AuthError;
use crate::session::record::{Session, SessionRecord, SessionRotation};
use crate::session::token::SignedToken;
use crate::signing::DataSigner;
use crate::storage::SessionStorage;

/// Establishes, extends, retrieves and abandons sessions.
///
/// All token verification happens here, before any storage lookup: a token
/// that fails its signature check is rejected as tampered without touching
/// the store, so integrity failures and not-found are distinct outcomes.
pub struct SessionProvider {
    storage: Arc<dyn SessionStorage>,
    signer: Arc<DataSigner>,
    max_lifetime: Duration,
    refresh_grace: Duration,
}

impl SessionProvider {
    /// Creates a provider over the given storage and signer.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the session windows cannot be
    /// represented.
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        signer: Arc<DataSigner>,
        config: &SessionConfig,
    ) -> AuthResult<Self> {
        let max_lifetime = Duration::try_from(config.max_session_lifetime)
            .map_err(|e| AuthError::configuration(format!("max_session_lifetime: {e}")))?;
        let refresh_grace = Duration::try_from(config.refresh_grace)
            .map_err(|e| AuthError::configuration(format!("refresh_grace: {e}")))?;
        Ok(Self {
            storage,
            signer,
            max_lifetime,
            refresh_grace,
        })
    }

    /// Establishes a session for an authenticated principal.
    ///
    /// The expiry is clamped to the configured maximum lifetime. A
    /// principal whose subject is the application itself (the sid and
    /// application-id claims agree) gets an application-only grant with no
    /// user binding.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` for an unauthenticated principal,
    /// `MissingClaim`/`InvalidClaim` when the sid or application-id claims
    /// are absent or malformed, and storage errors.
    pub async fn establish(
        &self,
        principal: &ClaimsPrincipal,
        expiry: OffsetDateTime,
        audience: &str,
    ) -> AuthResult<Session> {
        if !principal.is_authenticated() {
            return Err(AuthError::unauthenticated(
                "cannot establish a session for an unauthenticated principal",
            ));
        }

        let sid = parse_claim_sid(principal.primary().sid(), types::SID)?;
        let application_key = parse_claim_sid(principal.application_sid(), types::APPLICATION_ID)?;
        // The subject being the application itself means there is no user to
        // bind the session to.
        let user_key = (sid != application_key).then_some(sid);

        let now = OffsetDateTime::now_utc();
        let not_after = expiry.min(now + self.max_lifetime);

        let session_key = Uuid::new_v4();
        let refresh_id = fresh_refresh_id();
        let record = SessionRecord {
            session_key,
            application_key,
            user_key,
            audience: audience.to_string(),
            not_before: now,
            not_after,
            refresh_expiration: not_after + self.refresh_grace,
            refresh_token: Some(hex::encode(refresh_id)),
        };
        self.storage.create(&record).await?;

        tracing::debug!(
            session = %session_key,
            application = %application_key,
            application_grant = user_key.is_none(),
            audience,
            not_after = %not_after,
            "session established"
        );

        Ok(Session {
            token: SignedToken::seal(*session_key.as_bytes(), &self.signer)?,
            refresh_token: Some(SignedToken::seal(refresh_id, &self.signer)?),
            not_before: now,
            not_after,
        })
    }

    /// Extends a session by redeeming its refresh token.
    ///
    /// The refresh credential is consumed atomically and a replacement
    /// session is issued, preserving the original validity duration
    /// measured from now. The old session token stays valid until its own
    /// expiry; the old refresh token is single-use.
    ///
    /// # Errors
    ///
    /// Returns `TokenTampered` when the refresh token fails verification
    /// (before any lookup), `SessionNotFound` when the credential is
    /// consumed, expired or unknown, and storage errors.
    pub async fn extend(&self, refresh_token: &[u8]) -> AuthResult<Session> {
        let refresh_id = SignedToken::open(refresh_token, &self.signer)?;

        let rotation = SessionRotation {
            session_key: Uuid::new_v4(),
            refresh_id: fresh_refresh_id(),
            refresh_grace: self.refresh_grace,
        };
        let new_refresh_id = rotation.refresh_id;
        let now = OffsetDateTime::now_utc();
        let record = self.storage.rotate(&refresh_id, rotation, now).await?;

        tracing::debug!(
            session = %record.session_key,
            not_after = %record.not_after,
            "session extended"
        );

        Ok(Session {
            token: SignedToken::seal(*record.session_key.as_bytes(), &self.signer)?,
            refresh_token: Some(SignedToken::seal(new_refresh_id, &self.signer)?),
            not_before: record.not_before,
            not_after: record.not_after,
        })
    }

    /// Verifies a session token and returns the active session record.
    ///
    /// The returned record never carries the refresh credential.
    ///
    /// # Errors
    ///
    /// Returns `TokenTampered` when the token fails verification (before
    /// any lookup) and `SessionNotFound` for an expired or unknown session.
    pub async fn get(&self, token: &[u8]) -> AuthResult<SessionRecord> {
        let session_key = Uuid::from_bytes(SignedToken::open(token, &self.signer)?);
        let now = OffsetDateTime::now_utc();
        let mut record = self
            .storage
            .get(session_key, now)
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        record.refresh_token = None;
        Ok(record)
    }

    /// Abandons a session, removing it from the store.
    ///
    /// # Errors
    ///
    /// Returns `TokenTampered` when the token fails verification and
    /// `SessionNotFound` when no session matches.
    pub async fn abandon(&self, token: &[u8]) -> AuthResult<()> {
        let session_key = Uuid::from_bytes(SignedToken::open(token, &self.signer)?);
        if !self.storage.delete(session_key).await? {
            return Err(AuthError::SessionNotFound);
        }
        tracing::debug!(session = %session_key, "session abandoned");
        Ok(())
    }

    /// Removes sessions whose session and refresh windows have both passed.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn purge_expired(&self) -> AuthResult<u64> {
        let purged = self.storage.purge_expired(OffsetDateTime::now_utc()).await?;
        if purged > 0 {
            tracing::info!(purged, "expired sessions purged");
        }
        Ok(purged)
    }
}

fn parse_claim_sid(value: Option<&str>, claim_type: &str) -> AuthResult<Uuid> {
    let value = value.ok_or_else(|| AuthError::missing_claim(claim_type))?;
    Uuid::parse_str(value)
        .map_err(|e| AuthError::invalid_claim(claim_type, format!("not a valid identifier: {e}")))
}

fn fresh_refresh_id() -> [u8; 16] {
    let mut id = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut id);
    id
}
