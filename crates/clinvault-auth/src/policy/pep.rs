//! Policy enforcement.
//!
//! The enforcement gate sits in front of every protected operation: the
//! caller names a policy OID and the principal, and the gate either returns
//! `Ok(())` or an `AccessDenied` error. Deny and absence are
//! indistinguishable to the caller.

use std::sync::Arc;

use async_trait::async_trait;

use crate::AuthResult;
use crate::claims::{ClaimsPrincipal, types};
use crate::error::AuthError;
use crate::policy::pip::PolicyInformationService;
use crate::policy::types::{GrantType, PolicyInstance, Securable};

/// Evaluates a single demand against an already-resolved effective policy
/// set.
///
/// - `Grant` passes.
/// - `Elevate` passes only when the policy allows overrides and the
///   principal carries a granted-policy claim for the exact OID.
/// - `Deny`, an inactive policy, and an absent OID all fail identically.
///
/// # Errors
///
/// Returns `AccessDenied` carrying the demanded OID.
pub fn evaluate_demand(
    effective: &[PolicyInstance],
    principal: &ClaimsPrincipal,
    policy_oid: &str,
) -> AuthResult<()> {
    let grant = effective
        .iter()
        .find(|p| p.oid() == policy_oid && p.policy.is_active)
        .map(|p| (p.grant, p.policy.can_override));

    match grant {
        Some((GrantType::Grant, _)) => Ok(()),
        Some((GrantType::Elevate, true))
            if principal
                .find_all(types::GRANTED_POLICY)
                .iter()
                .any(|v| *v == policy_oid) =>
        {
            Ok(())
        }
        _ => {
            tracing::debug!(
                policy = policy_oid,
                principal = %principal.primary().name,
                "demand failed"
            );
            Err(AuthError::access_denied(policy_oid))
        }
    }
}

/// Gate demanding policies be granted before protected operations proceed.
#[async_trait]
pub trait PolicyEnforcement: Send + Sync {
    /// Demands the policy be granted to the principal.
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` when the outcome is anything but a grant, and
    /// propagates resolution errors.
    async fn demand(&self, policy_oid: &str, principal: &ClaimsPrincipal) -> AuthResult<()>;

    /// Demands at least one of the policies be granted.
    ///
    /// # Errors
    ///
    /// Returns the last `AccessDenied` when every demand fails; an empty
    /// OID list always fails.
    async fn demand_any(
        &self,
        policy_oids: &[&str],
        principal: &ClaimsPrincipal,
    ) -> AuthResult<()>;

    /// Non-failing probe: whether a demand for the policy would pass.
    ///
    /// # Errors
    ///
    /// Propagates resolution errors only; a denial is `Ok(false)`.
    async fn has_grant(&self, policy_oid: &str, principal: &ClaimsPrincipal) -> AuthResult<bool>;
}

/// Enforcement gate backed by the policy information service.
pub struct DefaultPolicyEnforcement {
    pip: Arc<PolicyInformationService>,
}

impl DefaultPolicyEnforcement {
    /// Creates an enforcement gate over the given information service.
    #[must_use]
    pub fn new(pip: Arc<PolicyInformationService>) -> Self {
        Self { pip }
    }

    async fn effective_policies(
        &self,
        principal: &ClaimsPrincipal,
    ) -> AuthResult<Vec<PolicyInstance>> {
        self.pip
            .get_policies(&Securable::Principal(principal.clone()))
            .await
    }
}

#[async_trait]
impl PolicyEnforcement for DefaultPolicyEnforcement {
    async fn demand(&self, policy_oid: &str, principal: &ClaimsPrincipal) -> AuthResult<()> {
        let effective = self.effective_policies(principal).await?;
        evaluate_demand(&effective, principal, policy_oid)
    }

    async fn demand_any(
        &self,
        policy_oids: &[&str],
        principal: &ClaimsPrincipal,
    ) -> AuthResult<()> {
        let effective = self.effective_policies(principal).await?;
        let mut last = Err(AuthError::access_denied(""));
        for oid in policy_oids {
            last = evaluate_demand(&effective, principal, oid);
            if last.is_ok() {
                return Ok(());
            }
        }
        last
    }

    async fn has_grant(&self, policy_oid: &str, principal: &ClaimsPrincipal) -> AuthResult<bool> {
        let effective = self.effective_policies(principal).await?;
        Ok(evaluate_demand(&effective, principal, policy_oid).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::claims::{Claim, ClaimsIdentity};
    use crate::policy::types::Policy;

    use super::*;

    fn instance(oid: &str, grant: GrantType) -> PolicyInstance {
        PolicyInstance::new(Policy::new(oid, format!("policy {oid}")), grant)
    }

    fn user_principal() -> ClaimsPrincipal {
        ClaimsPrincipal::new(ClaimsIdentity::user(Uuid::new_v4(), "jdoe", true))
    }

    #[test]
    fn test_grant_passes() {
        let effective = vec![instance("1.1", GrantType::Grant)];
        assert!(evaluate_demand(&effective, &user_principal(), "1.1").is_ok());
    }

    #[test]
    fn test_deny_and_absent_fail_identically() {
        let effective = vec![instance("1.1", GrantType::Deny)];
        let principal = user_principal();

        let denied = evaluate_demand(&effective, &principal, "1.1").unwrap_err();
        let absent = evaluate_demand(&effective, &principal, "1.2").unwrap_err();

        assert!(matches!(denied, AuthError::AccessDenied { .. }));
        assert!(matches!(absent, AuthError::AccessDenied { .. }));
    }

    #[test]
    fn test_elevate_requires_granted_policy_claim() {
        let effective = vec![instance("1.1", GrantType::Elevate)];

        let plain = user_principal();
        assert!(evaluate_demand(&effective, &plain, "1.1").is_err());

        let mut identity = ClaimsIdentity::user(Uuid::new_v4(), "jdoe", true);
        identity.add_claim(Claim::new(types::GRANTED_POLICY, "1.1"));
        let elevated = ClaimsPrincipal::new(identity);
        assert!(evaluate_demand(&effective, &elevated, "1.1").is_ok());
    }

    #[test]
    fn test_elevation_claim_must_match_exact_oid() {
        let effective = vec![instance("1.1.2", GrantType::Elevate)];

        let mut identity = ClaimsIdentity::user(Uuid::new_v4(), "jdoe", true);
        identity.add_claim(Claim::new(types::GRANTED_POLICY, "1.1"));
        let principal = ClaimsPrincipal::new(identity);

        assert!(evaluate_demand(&effective, &principal, "1.1.2").is_err());
    }

    #[test]
    fn test_non_overridable_policy_ignores_elevation_claim() {
        let mut policy = Policy::new("1.1", "locked");
        policy.can_override = false;
        let effective = vec![PolicyInstance::new(policy, GrantType::Elevate)];

        let mut identity = ClaimsIdentity::user(Uuid::new_v4(), "jdoe", true);
        identity.add_claim(Claim::new(types::GRANTED_POLICY, "1.1"));
        let principal = ClaimsPrincipal::new(identity);

        assert!(evaluate_demand(&effective, &principal, "1.1").is_err());
    }

    #[test]
    fn test_inactive_policy_is_treated_as_absent() {
        let mut policy = Policy::new("1.1", "retired");
        policy.is_active = false;
        let effective = vec![PolicyInstance::new(policy, GrantType::Grant)];

        assert!(evaluate_demand(&effective, &user_principal(), "1.1").is_err());
    }
}
