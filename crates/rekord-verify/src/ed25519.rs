//! `ed25519ph` format: Ed25519 in pre-hashed mode (RFC 8032 Ed25519ph).
//!
//! The message is hashed with SHA-512 as it streams in, so verification
//! needs constant memory regardless of artifact size.
//!
//! Keys are SubjectPublicKeyInfo, PEM or DER. The canonical key value is the
//! PEM encoding with LF line endings. Signatures are the 64 raw bytes.

use std::any::Any;

use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePublicKey, EncodePublicKey};
use ed25519_dalek::VerifyingKey;
use sha2::{Digest as _, Sha512};

use crate::capability::{ArtifactFactory, MessageVerifier, PublicKey, Signature};
use crate::error::{Result, VerificationError};

pub const FORMAT: &str = "ed25519ph";

const PEM_PREFIX: &[u8] = b"-----BEGIN";

pub struct Ed25519phFactory;

impl ArtifactFactory for Ed25519phFactory {
    fn format(&self) -> &'static str {
        FORMAT
    }

    fn new_signature(&self, bytes: &[u8]) -> Result<Box<dyn Signature>> {
        let signature = ed25519_dalek::Signature::from_slice(bytes)
            .map_err(|e| VerificationError::InvalidSignature(e.to_string()))?;
        Ok(Box::new(Ed25519phSignature(signature)))
    }

    fn new_public_key(&self, bytes: &[u8]) -> Result<Box<dyn PublicKey>> {
        let trimmed = bytes.trim_ascii();
        let key = if trimmed.starts_with(PEM_PREFIX) {
            let pem = std::str::from_utf8(trimmed)
                .map_err(|e| VerificationError::InvalidPublicKey(e.to_string()))?;
            VerifyingKey::from_public_key_pem(pem)
        } else {
            VerifyingKey::from_public_key_der(bytes)
        }
        .map_err(|e| VerificationError::InvalidPublicKey(e.to_string()))?;

        Ok(Box::new(Ed25519PublicKey(key)))
    }
}

#[derive(Debug, Clone)]
pub struct Ed25519PublicKey(VerifyingKey);

impl Ed25519PublicKey {
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.0
    }
}

impl PublicKey for Ed25519PublicKey {
    fn canonical_value(&self) -> Result<Vec<u8>> {
        let pem = self
            .0
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| VerificationError::InvalidPublicKey(e.to_string()))?;
        Ok(pem.into_bytes())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone)]
pub struct Ed25519phSignature(ed25519_dalek::Signature);

impl Signature for Ed25519phSignature {
    fn canonical_value(&self) -> Result<Vec<u8>> {
        Ok(self.0.to_bytes().to_vec())
    }

    fn verifier(&self, key: &dyn PublicKey) -> Result<Box<dyn MessageVerifier>> {
        let key = key
            .as_any()
            .downcast_ref::<Ed25519PublicKey>()
            .ok_or(VerificationError::IncompatibleKey { expected: FORMAT })?;

        Ok(Box::new(Ed25519phVerifier {
            key:       key.0,
            signature: self.0,
            prehash:   Sha512::new(),
        }))
    }
}

struct Ed25519phVerifier {
    key:       VerifyingKey,
    signature: ed25519_dalek::Signature,
    prehash:   Sha512,
}

impl MessageVerifier for Ed25519phVerifier {
    fn update(&mut self, data: &[u8]) {
        self.prehash.update(data);
    }

    fn finalize(self: Box<Self>) -> Result<()> {
        let Ed25519phVerifier {
            key,
            signature,
            prehash,
        } = *self;
        key.verify_prehashed(prehash, None, &signature)
            .map_err(|_| VerificationError::SignatureMismatch)
    }
}
