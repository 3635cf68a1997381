//! Session value types.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// A session row as held by the session store.
///
/// Records are immutable values: extension never mutates a record in place,
/// it consumes the old record's refresh credential and inserts a fresh
/// record in the same atomic operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Unique key of the session; the identifier inside the session token.
    pub session_key: Uuid,

    /// The application the principal is acting through.
    pub application_key: Uuid,

    /// The user the session was granted to. `None` for application-only
    /// grants (where the authenticated subject is the application itself).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_key: Option<Uuid>,

    /// Audience the session was issued for.
    pub audience: String,

    /// Start of the validity window.
    #[serde(with = "time::serde::rfc3339")]
    pub not_before: OffsetDateTime,

    /// End of the validity window (exclusive: the session is valid only
    /// while `not_after` is strictly in the future).
    #[serde(with = "time::serde::rfc3339")]
    pub not_after: OffsetDateTime,

    /// End of the refresh window (exclusive).
    #[serde(with = "time::serde::rfc3339")]
    pub refresh_expiration: OffsetDateTime,

    /// Hex-encoded 16-byte refresh token identifier. `None` once the
    /// refresh credential has been consumed by an extension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl SessionRecord {
    /// Returns `true` while the session token is redeemable.
    #[must_use]
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        self.not_before <= now && self.not_after > now
    }

    /// Returns `true` while the refresh token is redeemable.
    #[must_use]
    pub fn can_refresh(&self, now: OffsetDateTime) -> bool {
        self.refresh_token.is_some() && self.refresh_expiration > now
    }

    /// The validity duration granted at establishment, preserved across
    /// extensions.
    #[must_use]
    pub fn validity_duration(&self) -> Duration {
        self.not_after - self.not_before
    }

    /// Returns `true` when the session is an application-only grant.
    #[must_use]
    pub fn is_application_grant(&self) -> bool {
        self.user_key.is_none()
    }
}

/// What a caller receives from the session provider: signed token bytes and
/// the validity window, never the raw record.
#[derive(Debug, Clone)]
pub struct Session {
    /// Signed session token (`[session key][signature]`).
    pub token: Vec<u8>,

    /// Signed refresh token. Present on establish/extend, absent on get.
    pub refresh_token: Option<Vec<u8>>,

    /// Start of the validity window.
    pub not_before: OffsetDateTime,

    /// End of the validity window.
    pub not_after: OffsetDateTime,
}

/// Replacement parameters for an atomic session rotation.
///
/// The store derives the rest of the replacement row from the consumed row:
/// the new window starts at the rotation time and preserves the old row's
/// validity duration.
#[derive(Debug, Clone)]
pub struct SessionRotation {
    /// Key for the replacement session.
    pub session_key: Uuid,

    /// Fresh 16-byte refresh token identifier.
    pub refresh_id: [u8; 16],

    /// Grace period added after the new `not_after` for the refresh window.
    pub refresh_grace: Duration,
}
