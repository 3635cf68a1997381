//! Signed token wire format.
//!
//! A signed token is `[16-byte identifier][signature]`. Session tokens carry
//! the session key as the identifier; refresh tokens carry a random 16-byte
//! identifier. The signature must verify before the identifier may be
//! trusted; a token that fails verification is categorically untrusted
//! input and is never partially honored.

use crate::AuthResult;
use crate::error::AuthError;
use crate::signing::DataSigner;

/// Helper for sealing and opening `[identifier][signature]` tokens.
pub struct SignedToken;

impl SignedToken {
    /// Length of the token identifier in bytes.
    pub const IDENTIFIER_LEN: usize = 16;

    /// Signs the identifier and returns the sealed token bytes.
    ///
    /// # Errors
    ///
    /// Propagates signer failures.
    pub fn seal(identifier: [u8; 16], signer: &DataSigner) -> AuthResult<Vec<u8>> {
        let mut token = Vec::with_capacity(Self::IDENTIFIER_LEN + 32);
        token.extend_from_slice(&identifier);
        token.extend_from_slice(&signer.sign(&identifier)?);
        Ok(token)
    }

    /// Verifies the token and returns the trusted identifier.
    ///
    /// Verification happens before the identifier is returned; no lookup
    /// may be attempted on a token that fails here.
    ///
    /// # Errors
    ///
    /// Returns `TokenTampered` when the token is too short or the signature
    /// does not verify.
    pub fn open(token: &[u8], signer: &DataSigner) -> AuthResult<[u8; 16]> {
        if token.len() <= Self::IDENTIFIER_LEN {
            return Err(AuthError::token_tampered("token is too short"));
        }
        let (identifier, signature) = token.split_at(Self::IDENTIFIER_LEN);
        if !signer.verify(identifier, signature) {
            return Err(AuthError::token_tampered(
                "token signature failed verification",
            ));
        }
        let mut trusted = [0u8; Self::IDENTIFIER_LEN];
        trusted.copy_from_slice(identifier);
        Ok(trusted)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SigningConfig;

    use super::*;

    fn signer() -> DataSigner {
        DataSigner::from_config(&SigningConfig::Hmac {
            secret: Some("token test secret".to_string()),
            key_base64: None,
        })
        .unwrap()
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let signer = signer();
        let identifier = *uuid::Uuid::new_v4().as_bytes();

        let token = SignedToken::seal(identifier, &signer).unwrap();
        assert_eq!(token.len(), SignedToken::IDENTIFIER_LEN + 32);
        assert_eq!(SignedToken::open(&token, &signer).unwrap(), identifier);
    }

    #[test]
    fn test_open_rejects_any_flipped_byte() {
        let signer = signer();
        let token = SignedToken::seal([42u8; 16], &signer).unwrap();

        for i in 0..token.len() {
            let mut tampered = token.clone();
            tampered[i] ^= 0x01;
            let err = SignedToken::open(&tampered, &signer).unwrap_err();
            assert!(err.is_integrity_error(), "byte {i} not tamper-detected");
        }
    }

    #[test]
    fn test_open_rejects_short_token() {
        let signer = signer();
        let err = SignedToken::open(&[0u8; 16], &signer).unwrap_err();
        assert!(err.is_integrity_error());

        let err = SignedToken::open(&[], &signer).unwrap_err();
        assert!(err.is_integrity_error());
    }
}
