//! # clinvault-auth
//!
//! Security core for the ClinVault health record server.
//!
//! This crate provides:
//! - Claims-based identity model (user, application and device identities)
//! - Detached-signature service for opaque tokens (HMAC or RSA)
//! - Session provider with signed session and single-use refresh tokens
//! - Policy information service resolving effective policy sets across the
//!   user / role / application / device hierarchy
//! - Policy enforcement gate used by every other subsystem
//! - Storage traits for session and policy data
//!
//! ## Overview
//!
//! A caller authenticates and the [`session::SessionProvider`] establishes a
//! session, binding the principal's claims and minting signed tokens.
//! Subsequent requests present a token; the provider verifies its signature
//! before any lookup, the [`policy::PolicyInformationService`] computes the
//! effective policy set for the resolved principal, and
//! [`policy::PolicyEnforcement`] grants or denies the required policy OID.
//!
//! ## Modules
//!
//! - [`claims`] - Claims, identities and principals
//! - [`config`] - Security configuration
//! - [`signing`] - Detached signatures over opaque byte payloads
//! - [`session`] - Session establishment, extension and retrieval
//! - [`policy`] - Policy model, information service and enforcement
//! - [`storage`] - Storage traits implemented by backend crates

pub mod claims;
pub mod config;
pub mod error;
pub mod policy;
pub mod session;
pub mod signing;
pub mod storage;

pub use claims::{
    ActorType, Claim, ClaimTypeHandler, ClaimTypeRegistry, ClaimsIdentity, ClaimsPrincipal,
};
pub use config::{ConfigError, SecurityConfig, SessionConfig, SigningConfig};
pub use error::{AuthError, ErrorCategory};
pub use policy::{
    DefaultPolicyEnforcement, EntityKind, GrantType, Policy, PolicyInformationService,
    PolicyInstance, PolicyEnforcement, Securable, SecurableCategory, SecurableResolver,
};
pub use session::{Session, SessionProvider, SessionRecord, SessionRotation, SignedToken};
pub use signing::{DataSigner, SigningKeyring};
pub use storage::{
    AdhocCache, AssociationTarget, PolicyAssignment, PolicyRemoval, PolicyStorage, SessionStorage,
};

/// Type alias for security-core results.
pub type AuthResult<T> = Result<T, AuthError>;
