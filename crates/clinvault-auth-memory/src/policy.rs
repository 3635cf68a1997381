//! In-memory policy storage.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use clinvault_auth::{
    AssociationTarget, AuthResult, GrantType, Policy, PolicyAssignment, PolicyInstance,
    PolicyRemoval, PolicyStorage,
};

/// A policy attached to a versioned securable, effective from one version
/// sequence and optionally obsoleted at a later one.
#[derive(Debug, Clone)]
struct VersionedAssociation {
    target: Uuid,
    policy_key: Uuid,
    grant: GrantType,
    obsolete_at: Option<i64>,
}

#[derive(Default)]
struct PolicyTables {
    policies: HashMap<Uuid, Policy>,
    users: HashMap<Uuid, String>,
    user_roles: HashMap<Uuid, Vec<Uuid>>,
    applications: HashMap<Uuid, String>,
    devices: HashMap<Uuid, String>,
    role_associations: HashMap<Uuid, Vec<(Uuid, GrantType)>>,
    application_associations: HashMap<Uuid, Vec<(Uuid, GrantType)>>,
    device_associations: HashMap<Uuid, Vec<(Uuid, GrantType)>>,
    entity_associations: Vec<VersionedAssociation>,
    act_associations: Vec<VersionedAssociation>,
}

impl PolicyTables {
    fn instances(&self, associations: &[(Uuid, GrantType)]) -> Vec<PolicyInstance> {
        associations
            .iter()
            .filter_map(|(policy_key, grant)| {
                self.policies
                    .get(policy_key)
                    .map(|p| PolicyInstance::new(p.clone(), *grant))
            })
            .collect()
    }

    fn versioned_instances(
        &self,
        associations: &[VersionedAssociation],
        target: Uuid,
    ) -> Vec<PolicyInstance> {
        associations
            .iter()
            .filter(|a| a.target == target && a.obsolete_at.is_none())
            .filter_map(|a| {
                self.policies
                    .get(&a.policy_key)
                    .map(|p| PolicyInstance::new(p.clone(), a.grant))
            })
            .collect()
    }

    fn direct_associations(
        &mut self,
        target: &AssociationTarget,
    ) -> Option<&mut Vec<(Uuid, GrantType)>> {
        match target {
            AssociationTarget::Role(key) => Some(self.role_associations.entry(*key).or_default()),
            AssociationTarget::Application(key) => {
                Some(self.application_associations.entry(*key).or_default())
            }
            AssociationTarget::Device(key) => {
                Some(self.device_associations.entry(*key).or_default())
            }
            AssociationTarget::Entity { .. } | AssociationTarget::Act { .. } => None,
        }
    }
}

/// Policy store backed by hash maps under a single lock.
///
/// Batch mutations take one write guard for the whole batch, which gives
/// them the all-or-nothing behavior the trait requires. The seeding methods
/// (`add_policy`, `add_user`, `grant_role`, ...) populate the registry the
/// way a deployment's data tier would.
#[derive(Default)]
pub struct MemoryPolicyStorage {
    tables: RwLock<PolicyTables>,
}

impl MemoryPolicyStorage {
    /// Creates an empty policy store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, PolicyTables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PolicyTables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a policy and returns its key.
    pub fn add_policy(&self, policy: Policy) -> Uuid {
        let key = policy.key;
        self.write().policies.insert(key, policy);
        key
    }

    /// Registers a user account.
    pub fn add_user(&self, user_key: Uuid, user_name: impl Into<String>) {
        self.write().users.insert(user_key, user_name.into());
    }

    /// Adds a user to a role.
    pub fn grant_role(&self, user_key: Uuid, role_key: Uuid) {
        self.write()
            .user_roles
            .entry(user_key)
            .or_default()
            .push(role_key);
    }

    /// Registers a client application under its public identifier.
    pub fn add_application(&self, application_key: Uuid, public_id: impl Into<String>) {
        self.write()
            .applications
            .insert(application_key, public_id.into());
    }

    /// Registers a device under its public identifier.
    pub fn add_device(&self, device_key: Uuid, public_id: impl Into<String>) {
        self.write().devices.insert(device_key, public_id.into());
    }

    /// Seeds a role policy association directly.
    pub fn seed_role_policy(&self, role_key: Uuid, policy_key: Uuid, grant: GrantType) {
        self.write()
            .role_associations
            .entry(role_key)
            .or_default()
            .push((policy_key, grant));
    }

    /// Seeds an application policy association directly.
    pub fn seed_application_policy(
        &self,
        application_key: Uuid,
        policy_key: Uuid,
        grant: GrantType,
    ) {
        self.write()
            .application_associations
            .entry(application_key)
            .or_default()
            .push((policy_key, grant));
    }

    /// Seeds a device policy association directly.
    pub fn seed_device_policy(&self, device_key: Uuid, policy_key: Uuid, grant: GrantType) {
        self.write()
            .device_associations
            .entry(device_key)
            .or_default()
            .push((policy_key, grant));
    }
}

#[async_trait]
impl PolicyStorage for MemoryPolicyStorage {
    async fn policy_by_oid(&self, oid: &str) -> AuthResult<Option<Policy>> {
        Ok(self.read().policies.values().find(|p| p.oid == oid).cloned())
    }

    async fn all_policies(&self) -> AuthResult<Vec<Policy>> {
        let mut policies: Vec<Policy> = self
            .read()
            .policies
            .values()
            .filter(|p| p.obsoleted.is_none())
            .cloned()
            .collect();
        policies.sort_by(|a, b| a.oid.cmp(&b.oid));
        Ok(policies)
    }

    async fn role_policies(&self, role_key: Uuid) -> AuthResult<Vec<PolicyInstance>> {
        let tables = self.read();
        Ok(tables.instances(
            tables
                .role_associations
                .get(&role_key)
                .map_or(&[][..], Vec::as_slice),
        ))
    }

    async fn application_policies(
        &self,
        application_key: Uuid,
    ) -> AuthResult<Vec<PolicyInstance>> {
        let tables = self.read();
        Ok(tables.instances(
            tables
                .application_associations
                .get(&application_key)
                .map_or(&[][..], Vec::as_slice),
        ))
    }

    async fn application_policies_by_name(
        &self,
        public_id: &str,
    ) -> AuthResult<Vec<PolicyInstance>> {
        let tables = self.read();
        let Some(key) = tables
            .applications
            .iter()
            .find(|(_, id)| id.as_str() == public_id)
            .map(|(key, _)| *key)
        else {
            return Ok(Vec::new());
        };
        Ok(tables.instances(
            tables
                .application_associations
                .get(&key)
                .map_or(&[][..], Vec::as_slice),
        ))
    }

    async fn device_policies(&self, device_key: Uuid) -> AuthResult<Vec<PolicyInstance>> {
        let tables = self.read();
        Ok(tables.instances(
            tables
                .device_associations
                .get(&device_key)
                .map_or(&[][..], Vec::as_slice),
        ))
    }

    async fn device_policies_by_name(&self, public_id: &str) -> AuthResult<Vec<PolicyInstance>> {
        let tables = self.read();
        let Some(key) = tables
            .devices
            .iter()
            .find(|(_, id)| id.as_str() == public_id)
            .map(|(key, _)| *key)
        else {
            return Ok(Vec::new());
        };
        Ok(tables.instances(
            tables
                .device_associations
                .get(&key)
                .map_or(&[][..], Vec::as_slice),
        ))
    }

    async fn user_policies(&self, user_key: Uuid) -> AuthResult<Vec<PolicyInstance>> {
        let tables = self.read();
        let mut instances = Vec::new();
        for role_key in tables.user_roles.get(&user_key).map_or(&[][..], Vec::as_slice) {
            if let Some(associations) = tables.role_associations.get(role_key) {
                instances.extend(tables.instances(associations));
            }
        }
        Ok(instances)
    }

    async fn user_policies_by_name(&self, user_name: &str) -> AuthResult<Vec<PolicyInstance>> {
        let key = self
            .read()
            .users
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(user_name))
            .map(|(key, _)| *key);
        match key {
            Some(key) => self.user_policies(key).await,
            None => Ok(Vec::new()),
        }
    }

    async fn entity_policies(&self, entity_key: Uuid) -> AuthResult<Vec<PolicyInstance>> {
        let tables = self.read();
        Ok(tables.versioned_instances(&tables.entity_associations, entity_key))
    }

    async fn act_policies(&self, act_key: Uuid) -> AuthResult<Vec<PolicyInstance>> {
        let tables = self.read();
        Ok(tables.versioned_instances(&tables.act_associations, act_key))
    }

    async fn assign(&self, assignments: Vec<PolicyAssignment>) -> AuthResult<()> {
        let mut tables = self.write();
        for assignment in assignments {
            match &assignment.target {
                AssociationTarget::Entity { key, .. } | AssociationTarget::Act { key, .. } => {
                    let associations = match assignment.target {
                        AssociationTarget::Entity { .. } => &mut tables.entity_associations,
                        _ => &mut tables.act_associations,
                    };
                    // Un-obsolete or re-grade an existing association before
                    // inserting a duplicate.
                    if let Some(existing) = associations
                        .iter_mut()
                        .find(|a| a.target == *key && a.policy_key == assignment.policy_key)
                    {
                        existing.obsolete_at = None;
                        existing.grant = assignment.grant;
                    } else {
                        associations.push(VersionedAssociation {
                            target: *key,
                            policy_key: assignment.policy_key,
                            grant: assignment.grant,
                            obsolete_at: None,
                        });
                    }
                }
                target => {
                    if let Some(associations) = tables.direct_associations(target) {
                        associations.retain(|(policy_key, _)| *policy_key != assignment.policy_key);
                        associations.push((assignment.policy_key, assignment.grant));
                    }
                }
            }
        }
        Ok(())
    }

    async fn unassign(&self, removals: Vec<PolicyRemoval>) -> AuthResult<()> {
        let mut tables = self.write();
        for removal in removals {
            match &removal.target {
                AssociationTarget::Entity {
                    key,
                    version_sequence,
                }
                | AssociationTarget::Act {
                    key,
                    version_sequence,
                } => {
                    let associations = match removal.target {
                        AssociationTarget::Entity { .. } => &mut tables.entity_associations,
                        _ => &mut tables.act_associations,
                    };
                    if let Some(existing) = associations.iter_mut().find(|a| {
                        a.target == *key
                            && a.policy_key == removal.policy_key
                            && a.obsolete_at.is_none()
                    }) {
                        existing.obsolete_at = Some(*version_sequence);
                    }
                }
                target => {
                    if let Some(associations) = tables.direct_associations(target) {
                        associations.retain(|(policy_key, _)| *policy_key != removal.policy_key);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(oid: &str) -> Policy {
        Policy::new(oid, format!("policy {oid}"))
    }

    #[tokio::test]
    async fn test_user_policies_walk_role_membership() {
        let storage = MemoryPolicyStorage::new();
        let login = storage.add_policy(policy("1.0.5"));
        let read = storage.add_policy(policy("1.1.0"));

        let user = Uuid::new_v4();
        let role = Uuid::new_v4();
        storage.add_user(user, "JDoe");
        storage.grant_role(user, role);
        storage.seed_role_policy(role, login, GrantType::Grant);
        storage.seed_role_policy(role, read, GrantType::Grant);

        assert_eq!(storage.user_policies(user).await.unwrap().len(), 2);
        // Lookup by name is case-insensitive.
        assert_eq!(storage.user_policies_by_name("jdoe").await.unwrap().len(), 2);
        assert!(storage.user_policies_by_name("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assign_replaces_existing_direct_association() {
        let storage = MemoryPolicyStorage::new();
        let read = storage.add_policy(policy("1.1.0"));
        let role = Uuid::new_v4();
        storage.seed_role_policy(role, read, GrantType::Grant);

        storage
            .assign(vec![PolicyAssignment {
                target: AssociationTarget::Role(role),
                policy_key: read,
                grant: GrantType::Deny,
            }])
            .await
            .unwrap();

        let instances = storage.role_policies(role).await.unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].grant, GrantType::Deny);
    }

    #[tokio::test]
    async fn test_versioned_association_obsoletes_and_revives() {
        let storage = MemoryPolicyStorage::new();
        let restrict = storage.add_policy(policy("1.2.0"));
        let entity = Uuid::new_v4();

        storage
            .assign(vec![PolicyAssignment {
                target: AssociationTarget::Entity {
                    key: entity,
                    version_sequence: 1,
                },
                policy_key: restrict,
                grant: GrantType::Elevate,
            }])
            .await
            .unwrap();
        assert_eq!(storage.entity_policies(entity).await.unwrap().len(), 1);

        storage
            .unassign(vec![PolicyRemoval {
                target: AssociationTarget::Entity {
                    key: entity,
                    version_sequence: 2,
                },
                policy_key: restrict,
            }])
            .await
            .unwrap();
        assert!(storage.entity_policies(entity).await.unwrap().is_empty());

        // Re-assignment revives the obsoleted association.
        storage
            .assign(vec![PolicyAssignment {
                target: AssociationTarget::Entity {
                    key: entity,
                    version_sequence: 3,
                },
                policy_key: restrict,
                grant: GrantType::Deny,
            }])
            .await
            .unwrap();
        let instances = storage.entity_policies(entity).await.unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].grant, GrantType::Deny);
    }

    #[tokio::test]
    async fn test_all_policies_excludes_obsoleted() {
        let storage = MemoryPolicyStorage::new();
        storage.add_policy(policy("1.1.0"));
        let mut dead = policy("1.1.1");
        dead.obsoleted = Some(time::OffsetDateTime::now_utc());
        storage.add_policy(dead);

        let policies = storage.all_policies().await.unwrap();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].oid, "1.1.0");
    }
}
