//! Claims, identities and principals.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AuthResult;
use crate::claims::types;
use crate::error::AuthError;

/// A typed key/value fact attached to an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// The claim type URI.
    pub claim_type: String,

    /// The claim value.
    pub value: String,
}

impl Claim {
    /// Creates a new claim.
    #[must_use]
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// The category of actor an identity represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    /// A human user.
    User,
    /// A client application.
    Application,
    /// A device.
    Device,
}

impl ActorType {
    /// The claim value used for this actor type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Application => "application",
            Self::Device => "device",
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorType {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "application" => Ok(Self::Application),
            "device" => Ok(Self::Device),
            other => Err(AuthError::invalid_claim(
                types::ACTOR,
                format!("unknown actor type '{other}'"),
            )),
        }
    }
}

/// An authenticated (or anonymous) actor's immutable attribute set for the
/// duration of a request.
///
/// The typed constructors ([`ClaimsIdentity::user`],
/// [`ClaimsIdentity::application`], [`ClaimsIdentity::device`]) stamp the
/// three claims every consumer depends on: the sid claim, the type-specific
/// identifier claim, and the actor type claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimsIdentity {
    /// Account name of the identity.
    pub name: String,

    /// Whether this identity was produced by a successful authentication.
    pub is_authenticated: bool,

    /// The mechanism that authenticated the identity.
    pub authentication_type: String,

    claims: Vec<Claim>,
}

impl ClaimsIdentity {
    /// Creates a bare identity with no claims.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        is_authenticated: bool,
        authentication_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            is_authenticated,
            authentication_type: authentication_type.into(),
            claims: Vec::new(),
        }
    }

    /// Creates a user identity, stamping sid and actor claims.
    #[must_use]
    pub fn user(sid: Uuid, name: impl Into<String>, is_authenticated: bool) -> Self {
        let mut identity = Self::new(name, is_authenticated, "LOCAL");
        identity.add_claim(Claim::new(types::SID, sid.to_string()));
        identity.add_claim(Claim::new(types::ACTOR, ActorType::User.as_str()));
        identity
    }

    /// Creates an application identity, stamping sid, application-id and
    /// actor claims.
    #[must_use]
    pub fn application(sid: Uuid, name: impl Into<String>, is_authenticated: bool) -> Self {
        let mut identity = Self::new(name, is_authenticated, "SYSTEM");
        identity.add_claim(Claim::new(types::SID, sid.to_string()));
        identity.add_claim(Claim::new(types::APPLICATION_ID, sid.to_string()));
        identity.add_claim(Claim::new(types::ACTOR, ActorType::Application.as_str()));
        identity
    }

    /// Creates a device identity, stamping sid, device-id and actor claims.
    #[must_use]
    pub fn device(sid: Uuid, name: impl Into<String>, is_authenticated: bool) -> Self {
        let mut identity = Self::new(name, is_authenticated, "SYSTEM");
        identity.add_claim(Claim::new(types::SID, sid.to_string()));
        identity.add_claim(Claim::new(types::DEVICE_ID, sid.to_string()));
        identity.add_claim(Claim::new(types::ACTOR, ActorType::Device.as_str()));
        identity
    }

    /// Appends a claim. Multiple claims of the same type are valid.
    pub fn add_claim(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    /// Returns the first claim value of the given type, if any.
    #[must_use]
    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// Returns all claim values of the given type. Empty when absent.
    #[must_use]
    pub fn find_all(&self, claim_type: &str) -> Vec<&str> {
        self.claims
            .iter()
            .filter(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
            .collect()
    }

    /// All claims in insertion order.
    #[must_use]
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// The actor type stamped on this identity, if any.
    #[must_use]
    pub fn actor_type(&self) -> Option<ActorType> {
        self.find_first(types::ACTOR)
            .and_then(|v| v.parse().ok())
    }

    /// The subject identifier stamped on this identity, if any.
    #[must_use]
    pub fn sid(&self) -> Option<&str> {
        self.find_first(types::SID)
    }
}

/// A principal wrapping one or more identities.
///
/// A principal may aggregate a user identity plus an application identity
/// plus a device identity simultaneously; at most one identity per actor
/// category is permitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimsPrincipal {
    identities: Vec<ClaimsIdentity>,
}

impl ClaimsPrincipal {
    /// Creates a principal from its primary identity.
    #[must_use]
    pub fn new(identity: ClaimsIdentity) -> Self {
        Self {
            identities: vec![identity],
        }
    }

    /// Adds a secondary identity.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity` if the principal already carries an
    /// identity of the same actor category.
    pub fn add_identity(&mut self, identity: ClaimsIdentity) -> AuthResult<()> {
        if let Some(actor) = identity.actor_type() {
            if self.identity_of(actor).is_some() {
                return Err(AuthError::DuplicateIdentity {
                    actor_type: actor.to_string(),
                });
            }
        }
        self.identities.push(identity);
        Ok(())
    }

    /// The primary identity (the first one added).
    #[must_use]
    pub fn primary(&self) -> &ClaimsIdentity {
        &self.identities[0]
    }

    /// All identities in insertion order.
    #[must_use]
    pub fn identities(&self) -> &[ClaimsIdentity] {
        &self.identities
    }

    /// The identity of the given actor category, if present.
    #[must_use]
    pub fn identity_of(&self, actor: ActorType) -> Option<&ClaimsIdentity> {
        self.identities
            .iter()
            .find(|i| i.actor_type() == Some(actor))
    }

    /// Whether the primary identity is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.primary().is_authenticated
    }

    /// First claim value of the given type across all identities.
    #[must_use]
    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.identities
            .iter()
            .find_map(|i| i.find_first(claim_type))
    }

    /// All claim values of the given type across all identities.
    #[must_use]
    pub fn find_all(&self, claim_type: &str) -> Vec<&str> {
        self.identities
            .iter()
            .flat_map(|i| i.find_all(claim_type))
            .collect()
    }

    /// The subject identifier of the application identity, falling back to
    /// a principal-wide application-id claim.
    #[must_use]
    pub fn application_sid(&self) -> Option<&str> {
        self.identity_of(ActorType::Application)
            .and_then(ClaimsIdentity::sid)
            .or_else(|| self.find_first(types::APPLICATION_ID))
    }

    /// The subject identifier of the device identity, falling back to a
    /// principal-wide device-id claim.
    #[must_use]
    pub fn device_sid(&self) -> Option<&str> {
        self.identity_of(ActorType::Device)
            .and_then(ClaimsIdentity::sid)
            .or_else(|| self.find_first(types::DEVICE_ID))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_identity_stamps_contract_claims() {
        let sid = Uuid::new_v4();
        let identity = ClaimsIdentity::user(sid, "jdoe", true);

        assert_eq!(identity.sid(), Some(sid.to_string().as_str()));
        assert_eq!(identity.actor_type(), Some(ActorType::User));
        assert!(identity.is_authenticated);
    }

    #[test]
    fn test_application_identity_stamps_contract_claims() {
        let sid = Uuid::new_v4();
        let identity = ClaimsIdentity::application(sid, "fiddler-ehr", true);

        assert_eq!(identity.sid(), Some(sid.to_string().as_str()));
        assert_eq!(
            identity.find_first(types::APPLICATION_ID),
            Some(sid.to_string().as_str())
        );
        assert_eq!(identity.actor_type(), Some(ActorType::Application));
    }

    #[test]
    fn test_device_identity_stamps_contract_claims() {
        let sid = Uuid::new_v4();
        let identity = ClaimsIdentity::device(sid, "ward-tablet-3", true);

        assert_eq!(
            identity.find_first(types::DEVICE_ID),
            Some(sid.to_string().as_str())
        );
        assert_eq!(identity.actor_type(), Some(ActorType::Device));
    }

    #[test]
    fn test_duplicate_claim_types_are_preserved_in_order() {
        let mut identity = ClaimsIdentity::user(Uuid::new_v4(), "jdoe", true);
        identity.add_claim(Claim::new(types::GRANTED_POLICY, "1.2.3"));
        identity.add_claim(Claim::new(types::GRANTED_POLICY, "1.2.4"));

        assert_eq!(identity.find_all(types::GRANTED_POLICY), vec!["1.2.3", "1.2.4"]);
    }

    #[test]
    fn test_find_all_returns_empty_for_absent_type() {
        let identity = ClaimsIdentity::user(Uuid::new_v4(), "jdoe", true);
        assert!(identity.find_all(types::PURPOSE_OF_USE).is_empty());
    }

    #[test]
    fn test_principal_aggregates_identities() {
        let user_sid = Uuid::new_v4();
        let app_sid = Uuid::new_v4();
        let dev_sid = Uuid::new_v4();

        let mut principal = ClaimsPrincipal::new(ClaimsIdentity::user(user_sid, "jdoe", true));
        principal
            .add_identity(ClaimsIdentity::application(app_sid, "ehr", true))
            .unwrap();
        principal
            .add_identity(ClaimsIdentity::device(dev_sid, "tablet", true))
            .unwrap();

        assert_eq!(principal.primary().name, "jdoe");
        assert_eq!(
            principal.application_sid(),
            Some(app_sid.to_string().as_str())
        );
        assert_eq!(principal.device_sid(), Some(dev_sid.to_string().as_str()));
        assert!(principal.is_authenticated());
    }

    #[test]
    fn test_principal_rejects_duplicate_actor_category() {
        let mut principal =
            ClaimsPrincipal::new(ClaimsIdentity::user(Uuid::new_v4(), "jdoe", true));
        let err = principal
            .add_identity(ClaimsIdentity::user(Uuid::new_v4(), "other", true))
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateIdentity { .. }));
    }

    #[test]
    fn test_application_sid_falls_back_to_principal_claim() {
        let app_sid = Uuid::new_v4();
        let mut identity = ClaimsIdentity::user(Uuid::new_v4(), "jdoe", true);
        identity.add_claim(Claim::new(types::APPLICATION_ID, app_sid.to_string()));
        let principal = ClaimsPrincipal::new(identity);

        assert_eq!(
            principal.application_sid(),
            Some(app_sid.to_string().as_str())
        );
    }

    #[test]
    fn test_actor_type_parse() {
        assert_eq!("user".parse::<ActorType>().unwrap(), ActorType::User);
        assert_eq!(
            "application".parse::<ActorType>().unwrap(),
            ActorType::Application
        );
        assert!("robot".parse::<ActorType>().is_err());
    }
}
