//! Session storage trait.
//!
//! # Implementation notes
//!
//! - `rotate` must be atomic: a refresh token may be redeemed at most once,
//!   and callers must never observe the intermediate state between consuming
//!   the old credential and inserting the replacement row.
//! - All validity comparisons use the `now` passed by the caller, so that a
//!   single operation evaluates every sub-check against one clock reading.
//! - Never log token identifiers at rest.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::session::{SessionRecord, SessionRotation};

/// Storage trait for session records.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Persists a new session record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored (duplicate key,
    /// storage unavailable).
    async fn create(&self, record: &SessionRecord) -> AuthResult<()>;

    /// Finds an active session by key.
    ///
    /// Returns `Some(record)` only while `not_after > now` (the boundary is
    /// exclusive); expired or absent sessions yield `None`. Read-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get(
        &self,
        session_key: Uuid,
        now: OffsetDateTime,
    ) -> AuthResult<Option<SessionRecord>>;

    /// Atomically redeems a refresh token and inserts the replacement
    /// session.
    ///
    /// The old row is located by its refresh identifier where
    /// `refresh_expiration > now` and its refresh credential still present;
    /// the credential is consumed (so a concurrent second redemption
    /// observes not-found) and a replacement row is inserted that preserves
    /// the old row's validity duration measured from `now`:
    ///
    /// ```text
    /// new.not_before         = now
    /// new.not_after          = now + (old.not_after - old.not_before)
    /// new.refresh_expiration = new.not_after + rotation.refresh_grace
    /// ```
    ///
    /// The old session row itself stays retrievable by its session key until
    /// its original `not_after` passes.
    ///
    /// # Atomicity
    ///
    /// Implementations must make the consume+insert all-or-nothing. A
    /// relational backend would use one transaction:
    ///
    /// ```sql
    /// UPDATE sessions SET refresh_token = NULL
    /// WHERE refresh_token = $1 AND refresh_expiration > $2
    /// RETURNING *;
    /// INSERT INTO sessions (...) VALUES (...);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` when no redeemable row matches, and a
    /// storage error if the transaction fails (in which case nothing was
    /// changed).
    async fn rotate(
        &self,
        refresh_id: &[u8; 16],
        rotation: SessionRotation,
        now: OffsetDateTime,
    ) -> AuthResult<SessionRecord>;

    /// Deletes a session by key.
    ///
    /// Returns `true` when a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, session_key: Uuid) -> AuthResult<bool>;

    /// Deletes sessions whose session and refresh windows have both passed.
    ///
    /// Returns the number of rows removed. Intended to be called from a
    /// periodic maintenance job.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup fails.
    async fn purge_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;
}
