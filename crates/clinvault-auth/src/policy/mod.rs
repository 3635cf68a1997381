//! Policy model, information service and enforcement.
//!
//! The policy information service (PIP) resolves the effective set of
//! `(policy, grant)` pairs for a securable by walking the securable
//! hierarchy; the policy enforcement gate (PEP) demands a specific policy
//! OID be granted before an operation proceeds.

pub mod oids;
mod pep;
mod pip;
mod types;

pub use pep::{DefaultPolicyEnforcement, PolicyEnforcement, evaluate_demand};
pub use pip::{PolicyInformationService, SecurableResolver};
pub use types::{EntityKind, GrantType, Policy, PolicyInstance, Securable, SecurableCategory};
