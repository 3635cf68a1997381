//! Claim type URIs.
//!
//! Claim types are string URIs; multiple claims of the same type may be
//! attached to one identity (e.g. several granted-policy claims).

/// Subject identifier claim. An authenticated identity always carries
/// exactly one of these, matching its principal's primary key.
pub const SID: &str = "http://clinvault.org/claims/sid";

/// Actor type claim stamped by the identity constructors.
pub const ACTOR: &str = "http://clinvault.org/claims/actor";

/// Identifier of the application the principal is acting through.
pub const APPLICATION_ID: &str = "http://clinvault.org/claims/application-id";

/// Identifier of the device the principal is acting from.
pub const DEVICE_ID: &str = "http://clinvault.org/claims/device-id";

/// Policy OID granted to the principal for the current session
/// (claim-based elevation override).
pub const GRANTED_POLICY: &str = "http://clinvault.org/claims/grant";

/// Purpose of use for the current request.
pub const PURPOSE_OF_USE: &str = "urn:oasis:names:tc:xacml:2.0:action:purpose";

/// Role of the subject as asserted by an external party.
pub const SUBJECT_ROLE: &str = "urn:oasis:names:tc:xacml:2.0:subject:role";

/// Facility the subject is acting within.
pub const FACILITY: &str = "urn:oasis:names:tc:xspa:1.0:subject:facility";

/// Organization the subject belongs to.
pub const ORGANIZATION: &str = "urn:oasis:names:tc:xspa:1.0:subject:organization-id";
