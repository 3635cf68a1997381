//! # clinvault-auth-memory
//!
//! In-memory implementations of the `clinvault-auth` storage traits.
//!
//! These backends back single-node deployments and the integration test
//! suite. They honor the same contracts a relational backend would: the
//! session rotation is atomic under one lock, policy mutations apply as a
//! batch, and versioned associations are obsoleted rather than deleted.

mod cache;
mod policy;
mod session;

pub use cache::MemoryAdhocCache;
pub use policy::MemoryPolicyStorage;
pub use session::MemorySessionStorage;
