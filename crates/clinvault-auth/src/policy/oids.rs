//! Permission policy OIDs.
//!
//! Dotted-decimal identifiers for the built-in permissions, matched
//! case-sensitively and exactly.

/// Root of the permission arc.
pub const UNRESTRICTED_ALL: &str = "1.3.6.1.4.1.55471.3.1";

/// Administer the security subsystem.
pub const SECURITY_ADMINISTRATION: &str = "1.3.6.1.4.1.55471.3.1.0";

/// Assign or remove policies on roles, applications and devices.
pub const ASSIGN_POLICY: &str = "1.3.6.1.4.1.55471.3.1.0.3";

/// Log in interactively.
pub const LOGIN: &str = "1.3.6.1.4.1.55471.3.1.0.5";

/// Read clinical data.
pub const READ_CLINICAL_DATA: &str = "1.3.6.1.4.1.55471.3.1.1.0";

/// Write clinical data (patients, acts).
pub const WRITE_CLINICAL_DATA: &str = "1.3.6.1.4.1.55471.3.1.1.1";

/// Write materials and manufactured materials.
pub const WRITE_MATERIALS: &str = "1.3.6.1.4.1.55471.3.1.1.2";

/// Write places, organizations and providers.
pub const WRITE_PLACES_AND_ORGS: &str = "1.3.6.1.4.1.55471.3.1.1.3";

/// Override a disclosure restriction for emergency access.
pub const OVERRIDE_DISCLOSURE: &str = "1.3.6.1.4.1.55471.3.1.2.0";
