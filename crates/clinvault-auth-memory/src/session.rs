//! In-memory session storage.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use clinvault_auth::error::AuthError;
use clinvault_auth::{AuthResult, SessionRecord, SessionRotation, SessionStorage};

/// Session store backed by a hash map under a single lock.
///
/// The single lock is what makes [`SessionStorage::rotate`] atomic here:
/// consuming the old refresh credential and inserting the replacement row
/// happen under one write guard.
#[derive(Default)]
pub struct MemorySessionStorage {
    rows: RwLock<HashMap<Uuid, SessionRecord>>,
}

impl MemorySessionStorage {
    /// Creates an empty session store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, SessionRecord>> {
        self.rows.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, SessionRecord>> {
        self.rows.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of rows currently held, including expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` when the store holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn create(&self, record: &SessionRecord) -> AuthResult<()> {
        let mut rows = self.write();
        if rows.contains_key(&record.session_key) {
            return Err(AuthError::storage(format!(
                "duplicate session key {}",
                record.session_key
            )));
        }
        rows.insert(record.session_key, record.clone());
        Ok(())
    }

    async fn get(
        &self,
        session_key: Uuid,
        now: OffsetDateTime,
    ) -> AuthResult<Option<SessionRecord>> {
        Ok(self
            .read()
            .get(&session_key)
            .filter(|r| r.not_after > now)
            .cloned())
    }

    async fn rotate(
        &self,
        refresh_id: &[u8; 16],
        rotation: SessionRotation,
        now: OffsetDateTime,
    ) -> AuthResult<SessionRecord> {
        let needle = hex::encode(refresh_id);
        let mut rows = self.write();

        let old_key = rows
            .values()
            .find(|r| r.refresh_token.as_deref() == Some(needle.as_str()) && r.can_refresh(now))
            .map(|r| r.session_key)
            .ok_or(AuthError::SessionNotFound)?;

        let old = rows
            .get_mut(&old_key)
            .ok_or(AuthError::SessionNotFound)?;
        old.refresh_token = None;
        let duration = old.validity_duration();
        let application_key = old.application_key;
        let user_key = old.user_key;
        let audience = old.audience.clone();

        let replacement = SessionRecord {
            session_key: rotation.session_key,
            application_key,
            user_key,
            audience,
            not_before: now,
            not_after: now + duration,
            refresh_expiration: now + duration + rotation.refresh_grace,
            refresh_token: Some(hex::encode(rotation.refresh_id)),
        };
        rows.insert(replacement.session_key, replacement.clone());
        Ok(replacement)
    }

    async fn delete(&self, session_key: Uuid) -> AuthResult<bool> {
        Ok(self.write().remove(&session_key).is_some())
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let mut rows = self.write();
        let before = rows.len();
        rows.retain(|_, r| r.not_after > now || r.refresh_expiration > now);
        let purged = (before - rows.len()) as u64;
        if purged > 0 {
            tracing::debug!(purged, "expired sessions purged from memory store");
        }
        Ok(purged)
    }
}
