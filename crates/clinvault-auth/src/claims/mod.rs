//! Claims-based identity model.
//!
//! An identity is an ordered list of typed claims attached to a named actor.
//! Principals aggregate up to one identity per actor category (user,
//! application, device), representing "user acting via app X on device Y".
//! Identities are purely in-memory and rebuilt on every authentication or
//! session-resolution event.

mod identity;
mod registry;
pub mod types;

pub use identity::{ActorType, Claim, ClaimsIdentity, ClaimsPrincipal};
pub use registry::{ClaimTypeHandler, ClaimTypeRegistry, PurposeOfUseClaimHandler};
