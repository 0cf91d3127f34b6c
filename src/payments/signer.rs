//! RSA-SHA1 request signing
//!
//! The gateway expects the SHA-1 digest of the canonical body, signed with PKCS#1
//! v1.5 padding applied directly to the digest (no DigestInfo prefix), then
//! base64-encoded into the `Sign` header.

use base64::{engine::general_purpose, Engine as _};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};
use std::fmt;

use crate::error::{GatewayError, GatewayResult};

/// Signs canonical request bytes with the merchant's private key.
///
/// Owns the key for the lifetime of the session. The key is zeroized when the
/// signer is dropped.
pub struct Signer {
    key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl Signer {
    pub fn new(key: RsaPrivateKey) -> Self {
        let public_key = key.to_public_key();
        Self { key, public_key }
    }

    /// Returns the base64 signature over `canonical`.
    pub fn sign(&self, canonical: &[u8]) -> GatewayResult<String> {
        let digest = Sha1::digest(canonical);
        let signature = self
            .key
            .sign(Pkcs1v15Sign::new_unprefixed(), &digest)?;
        Ok(general_purpose::STANDARD.encode(signature))
    }

    /// Checks a base64 signature against `canonical` with the public half of the key.
    pub fn verify(&self, canonical: &[u8], signature: &str) -> GatewayResult<()> {
        let raw = general_purpose::STANDARD
            .decode(signature.trim())
            .map_err(|e| GatewayError::signing_error(format!("Signature is not base64: {}", e)))?;
        let digest = Sha1::digest(canonical);
        self.public_key
            .verify(Pkcs1v15Sign::new_unprefixed(), &digest, &raw)
            .map_err(|e| GatewayError::signing_error(format!("Signature mismatch: {}", e)))
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use rsa::traits::PublicKeyParts;
        f.debug_struct("Signer")
            .field("key_bits", &(self.public_key.size() * 8))
            .finish_non_exhaustive()
    }
}
