//! Policy model types.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::claims::ClaimsPrincipal;

/// Strength of a policy association.
///
/// The ordinals are persisted in store schemas and must not change. The
/// derived ordering makes `Deny` the smallest value, so "most restrictive"
/// is simply the minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantType {
    /// The action is explicitly denied.
    Deny = 0,
    /// The action is denied unless the principal holds a session-scoped
    /// granted-policy claim for the OID (elevation).
    Elevate = 1,
    /// The action is granted.
    Grant = 2,
}

impl GrantType {
    /// The persisted ordinal for this grant type.
    #[must_use]
    pub fn ordinal(&self) -> i32 {
        *self as i32
    }

    /// Parses a persisted ordinal.
    #[must_use]
    pub fn from_ordinal(ordinal: i32) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Deny),
            1 => Some(Self::Elevate),
            2 => Some(Self::Grant),
            _ => None,
        }
    }

    /// Returns the more restrictive of two grant types (Deny > Elevate >
    /// Grant in restrictiveness).
    #[must_use]
    pub fn most_restrictive(a: Self, b: Self) -> Self {
        a.min(b)
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deny => write!(f, "deny"),
            Self::Elevate => write!(f, "elevate"),
            Self::Grant => write!(f, "grant"),
        }
    }
}

/// A policy in the global registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Registry key.
    pub key: Uuid,

    /// Dotted-decimal OID identifying the permission (case-sensitive).
    pub oid: String,

    /// Human-readable name.
    pub name: String,

    /// Whether the policy participates in decisions.
    pub is_active: bool,

    /// Whether an Elevate association may be overridden by a
    /// granted-policy claim.
    pub can_override: bool,

    /// When the policy was obsoleted, if ever.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub obsoleted: Option<OffsetDateTime>,
}

impl Policy {
    /// Creates an active, overridable policy.
    #[must_use]
    pub fn new(oid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: Uuid::new_v4(),
            oid: oid.into(),
            name: name.into(),
            is_active: true,
            can_override: true,
            obsoleted: None,
        }
    }
}

/// A policy association: a policy attached to a securable with a grant type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyInstance {
    /// The attached policy.
    pub policy: Policy,

    /// Strength of the attachment.
    pub grant: GrantType,
}

impl PolicyInstance {
    /// Creates a new policy instance.
    #[must_use]
    pub fn new(policy: Policy, grant: GrantType) -> Self {
        Self { policy, grant }
    }

    /// The OID of the attached policy.
    #[must_use]
    pub fn oid(&self) -> &str {
        &self.policy.oid
    }
}

/// The kind of clinical entity, used to select the write policy demanded
/// when assigning policies to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A patient record.
    Patient,
    /// A material or manufactured material.
    Material,
    /// A place, organization or provider.
    PlaceOrOrganization,
    /// Any other entity kind.
    Other,
}

/// Anything that can have policies attached.
///
/// A tagged union instead of a type-test ladder: resolution strategies are
/// looked up by [`SecurableCategory`], and the override-scoping rule is one
/// shared algorithm parameterized by the category's association query.
#[derive(Debug, Clone)]
pub enum Securable {
    /// A security role, by key.
    Role(Uuid),
    /// A client application, by key.
    Application(Uuid),
    /// A device, by key.
    Device(Uuid),
    /// A user, by key (policies reach it via role membership).
    User(Uuid),
    /// A versioned clinical entity.
    Entity {
        /// Entity key.
        key: Uuid,
        /// Current version sequence.
        version_sequence: i64,
        /// Kind of entity, selecting the write policy for assignment.
        kind: EntityKind,
    },
    /// A versioned clinical act.
    Act {
        /// Act key.
        key: Uuid,
        /// Current version sequence.
        version_sequence: i64,
    },
    /// A principal (the common login path): resolution aggregates the
    /// user's roles with application and device claims.
    Principal(ClaimsPrincipal),
}

impl Securable {
    /// The category discriminator used to select a resolution strategy.
    #[must_use]
    pub fn category(&self) -> SecurableCategory {
        match self {
            Self::Role(_) => SecurableCategory::Role,
            Self::Application(_) => SecurableCategory::Application,
            Self::Device(_) => SecurableCategory::Device,
            Self::User(_) => SecurableCategory::User,
            Self::Entity { .. } => SecurableCategory::Entity,
            Self::Act { .. } => SecurableCategory::Act,
            Self::Principal(_) => SecurableCategory::Principal,
        }
    }

    /// Cache key for this securable's resolved policy set, when cacheable.
    ///
    /// Principals are never cached (their claims vary per request), and
    /// neither are users: a user's set is resolved through role membership,
    /// so a role mutation would leave a per-user entry stale without any
    /// key to invalidate it by.
    #[must_use]
    pub fn cache_key(&self) -> Option<String> {
        match self {
            Self::Role(key) => Some(format!("pip.role.{key}")),
            Self::Application(key) => Some(format!("pip.application.{key}")),
            Self::Device(key) => Some(format!("pip.device.{key}")),
            Self::User(_) => None,
            Self::Entity { key, .. } => Some(format!("pip.entity.{key}")),
            Self::Act { key, .. } => Some(format!("pip.act.{key}")),
            Self::Principal(_) => None,
        }
    }
}

/// Securable category discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurableCategory {
    /// Security role.
    Role,
    /// Client application.
    Application,
    /// Device.
    Device,
    /// User (via role membership).
    User,
    /// Versioned clinical entity.
    Entity,
    /// Versioned clinical act.
    Act,
    /// Principal/identity aggregate.
    Principal,
}

impl fmt::Display for SecurableCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role => write!(f, "Role"),
            Self::Application => write!(f, "Application"),
            Self::Device => write!(f, "Device"),
            Self::User => write!(f, "User"),
            Self::Entity => write!(f, "Entity"),
            Self::Act => write!(f, "Act"),
            Self::Principal => write!(f, "Principal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_type_ordinals_are_stable() {
        assert_eq!(GrantType::Deny.ordinal(), 0);
        assert_eq!(GrantType::Elevate.ordinal(), 1);
        assert_eq!(GrantType::Grant.ordinal(), 2);

        assert_eq!(GrantType::from_ordinal(0), Some(GrantType::Deny));
        assert_eq!(GrantType::from_ordinal(1), Some(GrantType::Elevate));
        assert_eq!(GrantType::from_ordinal(2), Some(GrantType::Grant));
        assert_eq!(GrantType::from_ordinal(3), None);
    }

    #[test]
    fn test_most_restrictive_ordering() {
        use GrantType::{Deny, Elevate, Grant};

        assert_eq!(GrantType::most_restrictive(Grant, Deny), Deny);
        assert_eq!(GrantType::most_restrictive(Deny, Grant), Deny);
        assert_eq!(GrantType::most_restrictive(Grant, Elevate), Elevate);
        assert_eq!(GrantType::most_restrictive(Elevate, Deny), Deny);
        assert_eq!(GrantType::most_restrictive(Grant, Grant), Grant);
    }

    #[test]
    fn test_securable_category_and_cache_key() {
        let key = Uuid::new_v4();
        let securable = Securable::Role(key);
        assert_eq!(securable.category(), SecurableCategory::Role);
        assert_eq!(securable.cache_key(), Some(format!("pip.role.{key}")));

        let principal = Securable::Principal(ClaimsPrincipal::new(
            crate::claims::ClaimsIdentity::user(Uuid::new_v4(), "jdoe", true),
        ));
        assert_eq!(principal.category(), SecurableCategory::Principal);
        assert_eq!(principal.cache_key(), None);

        // User sets are resolved through role membership; caching them would
        // leave stale grants after a role mutation.
        assert_eq!(Securable::User(Uuid::new_v4()).cache_key(), None);
    }

    #[test]
    fn test_policy_serde_roundtrip() {
        let policy = Policy::new("1.3.6.1.4.1.55471.3.1.1", "Test policy");
        let json = serde_json::to_string(&policy).unwrap();
        let parsed: Policy = serde_json::from_str(&json).unwrap();
        assert_eq!(policy, parsed);
    }
}
