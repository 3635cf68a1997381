//! Claim type handler registry.
//!
//! Handlers validate claim values before they are attached to an identity.
//! The registry is populated explicitly by the composition root during
//! process initialization; there is no implicit discovery.

use std::collections::HashMap;
use std::sync::Arc;

use crate::AuthResult;
use crate::claims::{Claim, ClaimsIdentity, types};
use crate::error::AuthError;

/// Validates values for a single claim type.
pub trait ClaimTypeHandler: Send + Sync {
    /// The claim type URI this handler owns.
    fn claim_type(&self) -> &str;

    /// Validates a claim value.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the value is unacceptable.
    fn validate(&self, value: &str) -> Result<(), String>;
}

/// Registry of claim type handlers, keyed by claim type URI.
///
/// Claim types without a registered handler are accepted as-is.
#[derive(Default)]
pub struct ClaimTypeRegistry {
    handlers: HashMap<String, Arc<dyn ClaimTypeHandler>>,
}

impl ClaimTypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler, replacing any existing handler for the same
    /// claim type.
    pub fn register(&mut self, handler: Arc<dyn ClaimTypeHandler>) {
        self.handlers
            .insert(handler.claim_type().to_string(), handler);
    }

    /// Returns the handler for the given claim type, if registered.
    #[must_use]
    pub fn handler(&self, claim_type: &str) -> Option<&Arc<dyn ClaimTypeHandler>> {
        self.handlers.get(claim_type)
    }

    /// Validates a claim against its registered handler, if any.
    ///
    /// # Errors
    ///
    /// Returns `InvalidClaim` when the handler rejects the value.
    pub fn validate(&self, claim: &Claim) -> AuthResult<()> {
        if let Some(handler) = self.handlers.get(&claim.claim_type) {
            handler
                .validate(&claim.value)
                .map_err(|message| AuthError::invalid_claim(&claim.claim_type, message))?;
        }
        Ok(())
    }

    /// Validates and attaches a claim to an identity.
    ///
    /// # Errors
    ///
    /// Returns `InvalidClaim` when the handler rejects the value; the claim
    /// is not attached.
    pub fn add_validated_claim(
        &self,
        identity: &mut ClaimsIdentity,
        claim: Claim,
    ) -> AuthResult<()> {
        self.validate(&claim)?;
        identity.add_claim(claim);
        Ok(())
    }
}

/// Handler for the purpose-of-use claim: the value must be non-empty.
pub struct PurposeOfUseClaimHandler;

impl ClaimTypeHandler for PurposeOfUseClaimHandler {
    fn claim_type(&self) -> &str {
        types::PURPOSE_OF_USE
    }

    fn validate(&self, value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            Err("purpose of use must not be empty".to_string())
        } else {
            Ok(())
        }
    }
}
