//! Policy information service.
//!
//! Resolves the effective set of `(policy, grant)` pairs for a securable by
//! combining policy associations across the securable hierarchy:
//!
//! - roles, applications, devices and users resolve their direct
//!   associations (users via role membership);
//! - principals aggregate the user's role policies with application- and
//!   device-claim policies, where application/device contributions may only
//!   narrow the set the user already holds;
//! - duplicate OIDs collapse to the most restrictive grant (deny wins
//!   across all levels).
//!
//! Resolution strategies are registered per [`SecurableCategory`]; a
//! category without a registered resolver yields an empty set, never an
//! error.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::claims::{ActorType, ClaimsPrincipal, types};
use crate::error::AuthError;
use crate::policy::oids;
use crate::policy::pep::evaluate_demand;
use crate::policy::types::{
    EntityKind, GrantType, Policy, PolicyInstance, Securable, SecurableCategory,
};
use crate::storage::{
    AdhocCache, AssociationTarget, PolicyAssignment, PolicyRemoval, PolicyStorage,
};

/// Resolution strategy for one securable category.
#[async_trait]
pub trait SecurableResolver: Send + Sync {
    /// Resolves the raw policy set for the securable.
    async fn resolve(
        &self,
        storage: &dyn PolicyStorage,
        securable: &Securable,
    ) -> AuthResult<Vec<PolicyInstance>>;
}

/// Resolves effective policy sets for securables and manages policy
/// associations.
pub struct PolicyInformationService {
    storage: Arc<dyn PolicyStorage>,
    cache: Option<Arc<dyn AdhocCache>>,
    resolvers: HashMap<SecurableCategory, Arc<dyn SecurableResolver>>,
}

impl PolicyInformationService {
    /// Creates a service with the default resolver for every securable
    /// category.
    #[must_use]
    pub fn new(storage: Arc<dyn PolicyStorage>) -> Self {
        let mut service = Self {
            storage,
            cache: None,
            resolvers: HashMap::new(),
        };
        service.register_resolver(SecurableCategory::Role, Arc::new(RoleResolver));
        service.register_resolver(SecurableCategory::Application, Arc::new(ApplicationResolver));
        service.register_resolver(SecurableCategory::Device, Arc::new(DeviceResolver));
        service.register_resolver(SecurableCategory::User, Arc::new(UserResolver));
        service.register_resolver(SecurableCategory::Entity, Arc::new(EntityResolver));
        service.register_resolver(SecurableCategory::Act, Arc::new(ActResolver));
        service.register_resolver(SecurableCategory::Principal, Arc::new(PrincipalResolver));
        service
    }

    /// Attaches an ad-hoc cache for policy lookups.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn AdhocCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Registers (or replaces) the resolver for a category.
    pub fn register_resolver(
        &mut self,
        category: SecurableCategory,
        resolver: Arc<dyn SecurableResolver>,
    ) {
        self.resolvers.insert(category, resolver);
    }

    /// Removes the resolver for a category; the category then resolves to
    /// an empty set.
    pub fn unregister_resolver(&mut self, category: SecurableCategory) {
        self.resolvers.remove(&category);
    }

    /// Resolves the effective policy set for a securable.
    ///
    /// # Errors
    ///
    /// Returns storage errors and claim-parse errors; an unrecognized
    /// securable category is not an error and yields an empty set.
    pub async fn get_policies(&self, securable: &Securable) -> AuthResult<Vec<PolicyInstance>> {
        let cache_key = securable.cache_key();
        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(value) = cache.get(key) {
                if let Ok(cached) = serde_json::from_value::<Vec<PolicyInstance>>(value) {
                    return Ok(cached);
                }
            }
        }

        let Some(resolver) = self.resolvers.get(&securable.category()) else {
            tracing::debug!(category = %securable.category(), "no resolver for securable category");
            return Ok(Vec::new());
        };

        let result = resolver.resolve(self.storage.as_ref(), securable).await?;

        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Ok(value) = serde_json::to_value(&result) {
                cache.put(key, value);
            }
        }

        Ok(result)
    }

    /// Resolves a single policy instance for a securable, if attached.
    ///
    /// # Errors
    ///
    /// Propagates resolution errors.
    pub async fn get_policy_instance(
        &self,
        securable: &Securable,
        policy_oid: &str,
    ) -> AuthResult<Option<PolicyInstance>> {
        Ok(self
            .get_policies(securable)
            .await?
            .into_iter()
            .find(|p| p.oid() == policy_oid))
    }

    /// Looks up a policy by OID through the ad-hoc cache.
    ///
    /// Concurrent misses may both query the store; the cache entry is
    /// invalidated explicitly when the policy registry changes.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn get_policy(&self, policy_oid: &str) -> AuthResult<Option<Policy>> {
        let cache_key = format!("pip.{policy_oid}");
        if let Some(cache) = &self.cache {
            if let Some(value) = cache.get(&cache_key) {
                if let Ok(policy) = serde_json::from_value::<Policy>(value) {
                    return Ok(Some(policy));
                }
            }
        }

        let policy = self.storage.policy_by_oid(policy_oid).await?;
        if let (Some(cache), Some(policy)) = (&self.cache, &policy) {
            if let Ok(value) = serde_json::to_value(policy) {
                cache.put(&cache_key, value);
            }
        }
        Ok(policy)
    }

    /// All policies that have not been obsoleted.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn get_all_policies(&self) -> AuthResult<Vec<Policy>> {
        self.storage.all_policies().await
    }

    /// Attaches policies to a securable.
    ///
    /// The caller must hold the assignment permission for the securable
    /// category. All OIDs are resolved before anything is written; a
    /// missing OID aborts the whole batch.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedSecurable` for categories that cannot carry
    /// assignments, `AccessDenied` when the principal lacks the required
    /// permission, `PolicyNotFound` for an unknown OID, and storage errors.
    pub async fn add_policies(
        &self,
        securable: &Securable,
        grant: GrantType,
        principal: &ClaimsPrincipal,
        policy_oids: &[&str],
    ) -> AuthResult<()> {
        let target = assignment_target(securable)?;
        self.demand(required_assignment_policy(securable)?, principal)
            .await?;

        let mut assignments = Vec::with_capacity(policy_oids.len());
        for oid in policy_oids {
            let policy = self
                .get_policy(oid)
                .await?
                .ok_or_else(|| AuthError::policy_not_found(*oid))?;
            assignments.push(PolicyAssignment {
                target: target.clone(),
                policy_key: policy.key,
                grant,
            });
        }

        self.storage.assign(assignments).await?;
        self.invalidate(securable);
        tracing::debug!(
            category = %securable.category(),
            %grant,
            count = policy_oids.len(),
            "policies assigned"
        );
        Ok(())
    }

    /// Detaches policies from a securable.
    ///
    /// Role/application/device associations are hard-deleted; versioned
    /// securables are obsoleted at their current version sequence.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::add_policies`].
    pub async fn remove_policies(
        &self,
        securable: &Securable,
        principal: &ClaimsPrincipal,
        policy_oids: &[&str],
    ) -> AuthResult<()> {
        let target = assignment_target(securable)?;
        self.demand(required_assignment_policy(securable)?, principal)
            .await?;

        let mut removals = Vec::with_capacity(policy_oids.len());
        for oid in policy_oids {
            let policy = self
                .get_policy(oid)
                .await?
                .ok_or_else(|| AuthError::policy_not_found(*oid))?;
            removals.push(PolicyRemoval {
                target: target.clone(),
                policy_key: policy.key,
            });
        }

        self.storage.unassign(removals).await?;
        self.invalidate(securable);
        tracing::debug!(
            category = %securable.category(),
            count = policy_oids.len(),
            "policies removed"
        );
        Ok(())
    }

    async fn demand(&self, policy_oid: &str, principal: &ClaimsPrincipal) -> AuthResult<()> {
        let effective = self
            .get_policies(&Securable::Principal(principal.clone()))
            .await?;
        evaluate_demand(&effective, principal, policy_oid)
    }

    fn invalidate(&self, securable: &Securable) {
        if let (Some(cache), Some(key)) = (&self.cache, securable.cache_key()) {
            cache.remove(&key);
        }
    }
}

/// The permission demanded before policies may be assigned to or removed
/// from a securable.
fn required_assignment_policy(securable: &Securable) -> AuthResult<&'static str> {
    match securable {
        Securable::Role(_) | Securable::Application(_) | Securable::Device(_) => {
            Ok(oids::ASSIGN_POLICY)
        }
        Securable::Act { .. } => Ok(oids::WRITE_CLINICAL_DATA),
        Securable::Entity { kind, .. } => Ok(match kind {
            EntityKind::Patient => oids::WRITE_CLINICAL_DATA,
            EntityKind::Material => oids::WRITE_MATERIALS,
            EntityKind::PlaceOrOrganization => oids::WRITE_PLACES_AND_ORGS,
            EntityKind::Other => oids::ASSIGN_POLICY,
        }),
        Securable::User(_) | Securable::Principal(_) => Err(AuthError::unsupported_securable(
            securable.category().to_string(),
        )),
    }
}

/// The association target for a securable, for categories that support
/// assignment.
fn assignment_target(securable: &Securable) -> AuthResult<AssociationTarget> {
    match securable {
        Securable::Role(key) => Ok(AssociationTarget::Role(*key)),
        Securable::Application(key) => Ok(AssociationTarget::Application(*key)),
        Securable::Device(key) => Ok(AssociationTarget::Device(*key)),
        Securable::Entity {
            key,
            version_sequence,
            ..
        } => Ok(AssociationTarget::Entity {
            key: *key,
            version_sequence: *version_sequence,
        }),
        Securable::Act {
            key,
            version_sequence,
        } => Ok(AssociationTarget::Act {
            key: *key,
            version_sequence: *version_sequence,
        }),
        Securable::User(_) | Securable::Principal(_) => Err(AuthError::unsupported_securable(
            securable.category().to_string(),
        )),
    }
}

/// Collapses duplicate OIDs to a single instance carrying the most
/// restrictive grant; first-seen order is preserved.
fn merge_most_restrictive(instances: Vec<PolicyInstance>) -> Vec<PolicyInstance> {
    let mut merged: Vec<PolicyInstance> = Vec::with_capacity(instances.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for instance in instances {
        match index.get(instance.oid()) {
            Some(&i) => {
                merged[i].grant = GrantType::most_restrictive(merged[i].grant, instance.grant);
            }
            None => {
                index.insert(instance.oid().to_string(), merged.len());
                merged.push(instance);
            }
        }
    }
    merged
}

fn parse_sid(value: &str, claim_type: &str) -> AuthResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| AuthError::invalid_claim(claim_type, format!("not a valid identifier: {e}")))
}

fn expect_variant<T>(category: SecurableCategory) -> AuthResult<T> {
    Err(AuthError::internal(format!(
        "resolver invoked with a securable that is not a {category}"
    )))
}

struct RoleResolver;

#[async_trait]
impl SecurableResolver for RoleResolver {
    async fn resolve(
        &self,
        storage: &dyn PolicyStorage,
        securable: &Securable,
    ) -> AuthResult<Vec<PolicyInstance>> {
        match securable {
            Securable::Role(key) => storage.role_policies(*key).await,
            _ => expect_variant(SecurableCategory::Role),
        }
    }
}

struct ApplicationResolver;

#[async_trait]
impl SecurableResolver for ApplicationResolver {
    async fn resolve(
        &self,
        storage: &dyn PolicyStorage,
        securable: &Securable,
    ) -> AuthResult<Vec<PolicyInstance>> {
        match securable {
            Securable::Application(key) => storage.application_policies(*key).await,
            _ => expect_variant(SecurableCategory::Application),
        }
    }
}

struct DeviceResolver;

#[async_trait]
impl SecurableResolver for DeviceResolver {
    async fn resolve(
        &self,
        storage: &dyn PolicyStorage,
        securable: &Securable,
    ) -> AuthResult<Vec<PolicyInstance>> {
        match securable {
            Securable::Device(key) => storage.device_policies(*key).await,
            _ => expect_variant(SecurableCategory::Device),
        }
    }
}

struct UserResolver;

#[async_trait]
impl SecurableResolver for UserResolver {
    async fn resolve(
        &self,
        storage: &dyn PolicyStorage,
        securable: &Securable,
    ) -> AuthResult<Vec<PolicyInstance>> {
        match securable {
            Securable::User(key) => storage.user_policies(*key).await,
            _ => expect_variant(SecurableCategory::User),
        }
    }
}

struct EntityResolver;

#[async_trait]
impl SecurableResolver for EntityResolver {
    async fn resolve(
        &self,
        storage: &dyn PolicyStorage,
        securable: &Securable,
    ) -> AuthResult<Vec<PolicyInstance>> {
        match securable {
            Securable::Entity { key, .. } => storage.entity_policies(*key).await,
            _ => expect_variant(SecurableCategory::Entity),
        }
    }
}

struct ActResolver;

#[async_trait]
impl SecurableResolver for ActResolver {
    async fn resolve(
        &self,
        storage: &dyn PolicyStorage,
        securable: &Securable,
    ) -> AuthResult<Vec<PolicyInstance>> {
        match securable {
            Securable::Act { key, .. } => storage.act_policies(*key).await,
            _ => expect_variant(SecurableCategory::Act),
        }
    }
}

/// The common login path: aggregates the user's role policies with
/// application- and device-claim policies.
///
/// Application and device grants only override policies the user already
/// holds; they can restrict but never widen the user's set. A principal
/// whose primary identity is itself an application or device resolves its
/// own associations unscoped (there is no user set to narrow).
struct PrincipalResolver;

#[async_trait]
impl SecurableResolver for PrincipalResolver {
    async fn resolve(
        &self,
        storage: &dyn PolicyStorage,
        securable: &Securable,
    ) -> AuthResult<Vec<PolicyInstance>> {
        let Securable::Principal(principal) = securable else {
            return expect_variant(SecurableCategory::Principal);
        };

        let primary = principal.primary();
        let combined = match primary.actor_type() {
            Some(ActorType::Device) => {
                let mut set = storage.device_policies_by_name(&primary.name).await?;
                if let Some(app_sid) = principal.application_sid() {
                    let app_key = parse_sid(app_sid, types::APPLICATION_ID)?;
                    set.extend(storage.application_policies(app_key).await?);
                }
                set
            }
            Some(ActorType::Application) => {
                storage.application_policies_by_name(&primary.name).await?
            }
            _ => {
                let user_set = storage.user_policies_by_name(&primary.name).await?;
                let user_oids: Vec<String> =
                    user_set.iter().map(|p| p.oid().to_string()).collect();
                let mut set = user_set;

                if let Some(app_sid) = principal.application_sid() {
                    let app_key = parse_sid(app_sid, types::APPLICATION_ID)?;
                    let app_set = storage.application_policies(app_key).await?;
                    set.extend(
                        app_set
                            .into_iter()
                            .filter(|p| user_oids.iter().any(|o| o == p.oid())),
                    );
                }

                if let Some(dev_sid) = principal.device_sid() {
                    let dev_key = parse_sid(dev_sid, types::DEVICE_ID)?;
                    let dev_set = storage.device_policies(dev_key).await?;
                    set.extend(
                        dev_set
                            .into_iter()
                            .filter(|p| user_oids.iter().any(|o| o == p.oid())),
                    );
                }

                set
            }
        };

        let effective = merge_most_restrictive(combined);
        tracing::debug!(
            principal = %primary.name,
            policies = %effective
                .iter()
                .map(|p| format!("{} [{}]", p.oid(), p.grant))
                .collect::<Vec<_>>()
                .join(","),
            "resolved effective policy set"
        );
        Ok(effective)
    }
}

#[cfg(test)]
mod tests {
    use crate::claims::ClaimsIdentity;

    use super::*;

    struct EmptyPolicyStorage;

    #[async_trait]
    impl PolicyStorage for EmptyPolicyStorage {
        async fn policy_by_oid(&self, _oid: &str) -> AuthResult<Option<Policy>> {
            Ok(None)
        }
        async fn all_policies(&self) -> AuthResult<Vec<Policy>> {
            Ok(Vec::new())
        }
        async fn role_policies(&self, _role_key: Uuid) -> AuthResult<Vec<PolicyInstance>> {
            Ok(Vec::new())
        }
        async fn application_policies(
            &self,
            _application_key: Uuid,
        ) -> AuthResult<Vec<PolicyInstance>> {
            Ok(Vec::new())
        }
        async fn application_policies_by_name(
            &self,
            _public_id: &str,
        ) -> AuthResult<Vec<PolicyInstance>> {
            Ok(Vec::new())
        }
        async fn device_policies(&self, _device_key: Uuid) -> AuthResult<Vec<PolicyInstance>> {
            Ok(Vec::new())
        }
        async fn device_policies_by_name(
            &self,
            _public_id: &str,
        ) -> AuthResult<Vec<PolicyInstance>> {
            Ok(Vec::new())
        }
        async fn user_policies(&self, _user_key: Uuid) -> AuthResult<Vec<PolicyInstance>> {
            Ok(Vec::new())
        }
        async fn user_policies_by_name(
            &self,
            _user_name: &str,
        ) -> AuthResult<Vec<PolicyInstance>> {
            Ok(Vec::new())
        }
        async fn entity_policies(&self, _entity_key: Uuid) -> AuthResult<Vec<PolicyInstance>> {
            Ok(Vec::new())
        }
        async fn act_policies(&self, _act_key: Uuid) -> AuthResult<Vec<PolicyInstance>> {
            Ok(Vec::new())
        }
        async fn assign(&self, _assignments: Vec<PolicyAssignment>) -> AuthResult<()> {
            Ok(())
        }
        async fn unassign(&self, _removals: Vec<PolicyRemoval>) -> AuthResult<()> {
            Ok(())
        }
    }

    fn instance(oid: &str, grant: GrantType) -> PolicyInstance {
        PolicyInstance::new(Policy::new(oid, format!("policy {oid}")), grant)
    }

    #[test]
    fn test_merge_keeps_most_restrictive_per_oid() {
        let merged = merge_most_restrictive(vec![
            instance("1.1", GrantType::Grant),
            instance("1.2", GrantType::Grant),
            instance("1.1", GrantType::Deny),
            instance("1.2", GrantType::Elevate),
            instance("1.3", GrantType::Deny),
        ]);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].oid(), "1.1");
        assert_eq!(merged[0].grant, GrantType::Deny);
        assert_eq!(merged[1].oid(), "1.2");
        assert_eq!(merged[1].grant, GrantType::Elevate);
        assert_eq!(merged[2].grant, GrantType::Deny);
    }

    #[test]
    fn test_merge_preserves_first_seen_order() {
        let merged = merge_most_restrictive(vec![
            instance("2.1", GrantType::Grant),
            instance("2.2", GrantType::Grant),
            instance("2.1", GrantType::Grant),
        ]);
        let oids: Vec<&str> = merged.iter().map(PolicyInstance::oid).collect();
        assert_eq!(oids, vec!["2.1", "2.2"]);
    }

    #[test]
    fn test_required_assignment_policy_per_category() {
        let role = Securable::Role(Uuid::new_v4());
        assert_eq!(required_assignment_policy(&role).unwrap(), oids::ASSIGN_POLICY);

        let patient = Securable::Entity {
            key: Uuid::new_v4(),
            version_sequence: 1,
            kind: EntityKind::Patient,
        };
        assert_eq!(
            required_assignment_policy(&patient).unwrap(),
            oids::WRITE_CLINICAL_DATA
        );

        let material = Securable::Entity {
            key: Uuid::new_v4(),
            version_sequence: 1,
            kind: EntityKind::Material,
        };
        assert_eq!(
            required_assignment_policy(&material).unwrap(),
            oids::WRITE_MATERIALS
        );

        let act = Securable::Act {
            key: Uuid::new_v4(),
            version_sequence: 1,
        };
        assert_eq!(
            required_assignment_policy(&act).unwrap(),
            oids::WRITE_CLINICAL_DATA
        );

        let user = Securable::User(Uuid::new_v4());
        assert!(matches!(
            required_assignment_policy(&user).unwrap_err(),
            AuthError::UnsupportedSecurable { .. }
        ));
    }

    #[tokio::test]
    async fn test_unregistered_category_resolves_to_empty_set() {
        let mut service = PolicyInformationService::new(Arc::new(EmptyPolicyStorage));
        service.unregister_resolver(SecurableCategory::Act);

        let act = Securable::Act {
            key: Uuid::new_v4(),
            version_sequence: 1,
        };
        let policies = service.get_policies(&act).await.unwrap();
        assert!(policies.is_empty());
    }

    #[tokio::test]
    async fn test_add_policies_rejects_unsupported_securable_before_demand() {
        let service = PolicyInformationService::new(Arc::new(EmptyPolicyStorage));
        let principal = ClaimsPrincipal::new(ClaimsIdentity::user(Uuid::new_v4(), "jdoe", true));

        let err = service
            .add_policies(
                &Securable::User(Uuid::new_v4()),
                GrantType::Grant,
                &principal,
                &[oids::LOGIN],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UnsupportedSecurable { .. }));
    }
}
