//! Detached signatures over opaque byte payloads.
//!
//! The signer is constructed once from configuration at startup and shared
//! (read-only) across all threads. A missing or unusable signing key is a
//! fatal configuration error; [`DataSigner::verify`] itself never errors for
//! invalid input, it returns `false`.
//!
//! Supported algorithms:
//! - HMAC-SHA256 over a shared secret (the secret is digested with SHA-256
//!   unless exactly 32 raw key bytes are supplied)
//! - RSA PKCS#1 v1.5 with SHA-256 over an X.509-style private key

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{Keypair, SignatureEncoding, Signer, Verifier};
use sha2::{Digest, Sha256};

use crate::AuthResult;
use crate::config::SigningConfig;
use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 key length in bytes.
const HMAC_KEY_LEN: usize = 32;

enum SignerInner {
    Hmac {
        key: Vec<u8>,
    },
    Rsa {
        signing: SigningKey<Sha256>,
        verifying: VerifyingKey<Sha256>,
    },
}

/// Produces and verifies detached signatures using a configured key.
///
/// Thread-safe; wrap in an [`Arc`] and share across the process.
pub struct DataSigner {
    inner: SignerInner,
}

impl fmt::Debug for DataSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSigner")
            .field("algorithm", &self.algorithm())
            .finish()
    }
}

impl DataSigner {
    /// Builds a signer from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when no key material is present, the base64
    /// key cannot be decoded, or the PEM key cannot be parsed. Callers must
    /// treat this as a startup failure.
    pub fn from_config(config: &SigningConfig) -> AuthResult<Self> {
        match config {
            SigningConfig::Hmac { secret, key_base64 } => {
                let key = Self::derive_hmac_key(secret.as_deref(), key_base64.as_deref())?;
                Ok(Self {
                    inner: SignerInner::Hmac { key },
                })
            }
            SigningConfig::Rsa { private_key_pem } => {
                if private_key_pem.is_empty() {
                    return Err(AuthError::configuration("RSA private key is empty"));
                }
                let private_key = RsaPrivateKey::from_pkcs8_pem(private_key_pem)
                    .or_else(|_| RsaPrivateKey::from_pkcs1_pem(private_key_pem))
                    .map_err(|e| {
                        AuthError::configuration(format!("cannot parse RSA private key: {e}"))
                    })?;
                let signing = SigningKey::<Sha256>::new(private_key);
                let verifying = signing.verifying_key();
                Ok(Self {
                    inner: SignerInner::Rsa { signing, verifying },
                })
            }
        }
    }

    /// Derives the fixed-length HMAC key: raw key bytes are used as-is when
    /// they are already key-length, everything else is digested.
    fn derive_hmac_key(secret: Option<&str>, key_base64: Option<&str>) -> AuthResult<Vec<u8>> {
        if let Some(b64) = key_base64.filter(|k| !k.is_empty()) {
            let bytes = BASE64
                .decode(b64)
                .map_err(|e| AuthError::configuration(format!("invalid signing key: {e}")))?;
            if bytes.len() == HMAC_KEY_LEN {
                return Ok(bytes);
            }
            return Ok(Sha256::digest(&bytes).to_vec());
        }
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            return Ok(Sha256::digest(secret.as_bytes()).to_vec());
        }
        Err(AuthError::configuration(
            "no signing key material configured",
        ))
    }

    /// The configured signature algorithm name.
    #[must_use]
    pub fn algorithm(&self) -> &'static str {
        match &self.inner {
            SignerInner::Hmac { .. } => "HS256",
            SignerInner::Rsa { .. } => "RS256",
        }
    }

    /// Signs the payload, returning the detached signature bytes.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the underlying primitive fails; never fails for
    /// any particular payload content.
    pub fn sign(&self, payload: &[u8]) -> AuthResult<Vec<u8>> {
        match &self.inner {
            SignerInner::Hmac { key } => {
                let mut mac = HmacSha256::new_from_slice(key)
                    .map_err(|e| AuthError::internal(format!("HMAC key rejected: {e}")))?;
                mac.update(payload);
                Ok(mac.finalize().into_bytes().to_vec())
            }
            SignerInner::Rsa { signing, .. } => {
                let signature = signing
                    .try_sign(payload)
                    .map_err(|e| AuthError::internal(format!("RSA signing failed: {e}")))?;
                Ok(signature.to_vec())
            }
        }
    }

    /// Verifies a detached signature over the payload.
    ///
    /// Pure function: invalid or malformed signatures yield `false`, never
    /// an error.
    #[must_use]
    pub fn verify(&self, payload: &[u8], signature: &[u8]) -> bool {
        match &self.inner {
            SignerInner::Hmac { key } => {
                let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
                    return false;
                };
                mac.update(payload);
                mac.verify_slice(signature).is_ok()
            }
            SignerInner::Rsa { verifying, .. } => match Signature::try_from(signature) {
                Ok(signature) => verifying.verify(payload, &signature).is_ok(),
                Err(_) => false,
            },
        }
    }
}

/// A set of named signers with a process-wide default.
///
/// Named keys let tokens minted under an older key remain verifiable while a
/// newer default key signs fresh tokens.
pub struct SigningKeyring {
    default: Arc<DataSigner>,
    named: HashMap<String, Arc<DataSigner>>,
}

impl SigningKeyring {
    /// Creates a keyring with the given default signer.
    #[must_use]
    pub fn new(default: Arc<DataSigner>) -> Self {
        Self {
            default,
            named: HashMap::new(),
        }
    }

    /// Registers a named signer.
    pub fn insert(&mut self, key_id: impl Into<String>, signer: Arc<DataSigner>) {
        self.named.insert(key_id.into(), signer);
    }

    /// Returns the signer for the given key id, or the default when `None`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when the named key does not exist.
    pub fn signer(&self, key_id: Option<&str>) -> AuthResult<Arc<DataSigner>> {
        match key_id {
            None => Ok(Arc::clone(&self.default)),
            Some(id) => self
                .named
                .get(id)
                .cloned()
                .ok_or_else(|| AuthError::configuration(format!("no signing key '{id}'"))),
        }
    }

    /// Registered key ids.
    #[must_use]
    pub fn key_ids(&self) -> Vec<&str> {
        self.named.keys().map(String::as_str).collect()
    }
}
