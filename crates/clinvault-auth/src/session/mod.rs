//! Session establishment, extension and retrieval.
//!
//! Sessions are time-bounded authorization artifacts. Callers hold only the
//! signed token bytes; retrieving a session hands back its record with the
//! refresh credential stripped.

mod provider;
mod record;
mod token;

pub use provider::SessionProvider;
pub use record::{Session, SessionRecord, SessionRotation};
pub use token::SignedToken;
