//! Storage traits for security-core data.
//!
//! This module defines the storage interfaces for:
//!
//! - Session records (including atomic refresh rotation)
//! - Policies and per-securable policy associations
//! - The ad-hoc cache used to short-circuit policy lookups
//!
//! # Implementations
//!
//! Storage implementations are provided in separate crates:
//!
//! - `clinvault-auth-memory` - in-memory backend for tests and embedded use

mod cache;
mod policy;
mod session;

pub use cache::AdhocCache;
pub use policy::{AssociationTarget, PolicyAssignment, PolicyRemoval, PolicyStorage};
pub use session::SessionStorage;
