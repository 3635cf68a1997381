//! Security configuration.
//!
//! Configuration selects the token signing mode (shared secret or RSA key)
//! and the session lifetime windows. A configuration without a usable
//! signing key fails [`SecurityConfig::validate`]; the server must treat
//! that as a startup failure, never as a per-call error.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root security configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [security.signing]
/// mode = "hmac"
/// secret = "correct horse battery staple"
///
/// [security.session]
/// max_session_lifetime = "1h"
/// refresh_grace = "10m"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Token signing configuration.
    pub signing: SigningConfig,

    /// Session lifetime configuration.
    pub session: SessionConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            signing: SigningConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Token signing configuration.
///
/// Exactly one signing mode is configured. The symmetric mode accepts either
/// a raw shared secret (digested with SHA-256 into a fixed-length key) or
/// key bytes supplied directly as base64. The asymmetric mode takes an RSA
/// private key in PEM form.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SigningConfig {
    /// HMAC-SHA256 with a shared secret or raw key bytes.
    Hmac {
        /// Shared secret. Digested with SHA-256 unless `key_base64` is set.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secret: Option<String>,

        /// Raw key bytes, base64 encoded. Takes precedence over `secret`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key_base64: Option<String>,
    },

    /// RSA PKCS#1 v1.5 with SHA-256 over an RSA private key.
    Rsa {
        /// RSA private key in PKCS#8 or PKCS#1 PEM form.
        private_key_pem: String,
    },
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self::Hmac {
            secret: None,
            key_base64: None,
        }
    }
}

impl SigningConfig {
    /// Returns `true` if any key material is configured.
    #[must_use]
    pub fn has_key_material(&self) -> bool {
        match self {
            Self::Hmac { secret, key_base64 } => {
                secret.as_deref().is_some_and(|s| !s.is_empty())
                    || key_base64.as_deref().is_some_and(|k| !k.is_empty())
            }
            Self::Rsa { private_key_pem } => !private_key_pem.is_empty(),
        }
    }
}

/// Session lifetime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum session lifetime granted at establishment.
    #[serde(with = "humantime_serde")]
    pub max_session_lifetime: Duration,

    /// Grace period after session expiry during which the refresh token
    /// can still be redeemed.
    #[serde(with = "humantime_serde")]
    pub refresh_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_session_lifetime: Duration::from_secs(3600), // 1 hour
            refresh_grace: Duration::from_secs(600),         // 10 minutes
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl SecurityConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no signing key material is
    /// configured, and `ConfigError::InvalidValue` if the session windows
    /// are zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.signing.has_key_material() {
            return Err(ConfigError::Missing(
                "signing key (secret, key_base64 or private_key_pem)".to_string(),
            ));
        }

        if self.session.max_session_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "max_session_lifetime must be > 0".to_string(),
            ));
        }

        if self.session.refresh_grace.is_zero() {
            return Err(ConfigError::InvalidValue(
                "refresh_grace must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session_windows() {
        let config = SessionConfig::default();
        assert_eq!(config.max_session_lifetime, Duration::from_secs(3600));
        assert_eq!(config.refresh_grace, Duration::from_secs(600));
    }

    #[test]
    fn test_default_config_has_no_key_and_fails_validation() {
        let config = SecurityConfig::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
        assert!(err.to_string().contains("signing key"));
    }

    #[test]
    fn test_hmac_secret_validates() {
        let mut config = SecurityConfig::default();
        config.signing = SigningConfig::Hmac {
            secret: Some("shhh".to_string()),
            key_base64: None,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_secret_is_not_key_material() {
        let signing = SigningConfig::Hmac {
            secret: Some(String::new()),
            key_base64: None,
        };
        assert!(!signing.has_key_material());
    }

    #[test]
    fn test_zero_lifetime_fails_validation() {
        let mut config = SecurityConfig::default();
        config.signing = SigningConfig::Hmac {
            secret: Some("shhh".to_string()),
            key_base64: None,
        };
        config.session.max_session_lifetime = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_session_lifetime"));
    }

    #[test]
    fn test_signing_mode_deserializes_from_tagged_form() {
        let config: SigningConfig =
            serde_json::from_str(r#"{"mode": "hmac", "secret": "shhh"}"#).unwrap();
        assert!(matches!(config, SigningConfig::Hmac { .. }));
        assert!(config.has_key_material());

        let config: SigningConfig =
            serde_json::from_str(r#"{"mode": "rsa", "private_key_pem": "-----BEGIN..."}"#)
                .unwrap();
        assert!(matches!(config, SigningConfig::Rsa { .. }));
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = SecurityConfig {
            signing: SigningConfig::Hmac {
                secret: Some("shhh".to_string()),
                key_base64: None,
            },
            session: SessionConfig::default(),
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: SecurityConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed.session.max_session_lifetime,
            config.session.max_session_lifetime
        );
        assert!(parsed.signing.has_key_material());
    }
}
