//! Policy storage trait.
//!
//! Association queries return `(policy, grant)` pairs for one securable
//! category each; the layered resolution and override scoping live in the
//! policy information service, not here. Batch mutations are transactional:
//! either every assignment in the batch lands or none do.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::policy::{GrantType, Policy, PolicyInstance};

/// The securable side of a policy association mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssociationTarget {
    /// A security role.
    Role(Uuid),
    /// A client application.
    Application(Uuid),
    /// A device.
    Device(Uuid),
    /// A versioned clinical entity at its current version sequence.
    Entity {
        /// Entity key.
        key: Uuid,
        /// Version sequence the association becomes effective at.
        version_sequence: i64,
    },
    /// A versioned clinical act at its current version sequence.
    Act {
        /// Act key.
        key: Uuid,
        /// Version sequence the association becomes effective at.
        version_sequence: i64,
    },
}

/// One policy association to upsert.
#[derive(Debug, Clone)]
pub struct PolicyAssignment {
    /// The securable receiving the policy.
    pub target: AssociationTarget,
    /// Key of the policy being attached.
    pub policy_key: Uuid,
    /// Strength of the association.
    pub grant: GrantType,
}

/// One policy association to remove.
#[derive(Debug, Clone)]
pub struct PolicyRemoval {
    /// The securable losing the policy.
    pub target: AssociationTarget,
    /// Key of the policy being detached.
    pub policy_key: Uuid,
}

/// Storage trait for policies and policy associations.
#[async_trait]
pub trait PolicyStorage: Send + Sync {
    /// Looks up a policy by OID (case-sensitive exact match).
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn policy_by_oid(&self, oid: &str) -> AuthResult<Option<Policy>>;

    /// All policies that have not been obsoleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn all_policies(&self) -> AuthResult<Vec<Policy>>;

    /// Direct policy associations of a role.
    async fn role_policies(&self, role_key: Uuid) -> AuthResult<Vec<PolicyInstance>>;

    /// Direct policy associations of an application, by key.
    async fn application_policies(
        &self,
        application_key: Uuid,
    ) -> AuthResult<Vec<PolicyInstance>>;

    /// Direct policy associations of an application, resolved by its public
    /// identifier (the application identity's name).
    async fn application_policies_by_name(
        &self,
        public_id: &str,
    ) -> AuthResult<Vec<PolicyInstance>>;

    /// Direct policy associations of a device, by key.
    async fn device_policies(&self, device_key: Uuid) -> AuthResult<Vec<PolicyInstance>>;

    /// Direct policy associations of a device, resolved by its public
    /// identifier.
    async fn device_policies_by_name(&self, public_id: &str) -> AuthResult<Vec<PolicyInstance>>;

    /// Policies reachable through a user's role memberships, by user key.
    async fn user_policies(&self, user_key: Uuid) -> AuthResult<Vec<PolicyInstance>>;

    /// Policies reachable through a user's role memberships, resolved by
    /// user name (case-insensitive).
    async fn user_policies_by_name(&self, user_name: &str) -> AuthResult<Vec<PolicyInstance>>;

    /// Active (not obsoleted) policy associations of a versioned entity.
    async fn entity_policies(&self, entity_key: Uuid) -> AuthResult<Vec<PolicyInstance>>;

    /// Active (not obsoleted) policy associations of a versioned act.
    async fn act_policies(&self, act_key: Uuid) -> AuthResult<Vec<PolicyInstance>>;

    /// Upserts a batch of policy associations as one transaction.
    ///
    /// Role/application/device associations replace any existing association
    /// for the same `(target, policy)` pair. Versioned associations
    /// un-obsolete a previously obsoleted association rather than inserting
    /// a duplicate.
    ///
    /// # Errors
    ///
    /// On any failure the whole batch is rolled back.
    async fn assign(&self, assignments: Vec<PolicyAssignment>) -> AuthResult<()>;

    /// Removes a batch of policy associations as one transaction.
    ///
    /// Role/application/device associations are hard-deleted; versioned
    /// associations are marked obsolete at the target's version sequence.
    ///
    /// # Errors
    ///
    /// On any failure the whole batch is rolled back.
    async fn unassign(&self, removals: Vec<PolicyRemoval>) -> AuthResult<()>;
}
