//! Pluggable signature verification.
//!
//! A format (for example `ed25519ph`) is implemented by an [`ArtifactFactory`]
//! that parses key and signature bytes into opaque [`PublicKey`] and
//! [`Signature`] objects. Verification is incremental: the artifact is fed
//! through a [`MessageVerifier`] chunk by chunk, so it never has to be held
//! in memory as a whole.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, VerificationError};

/// A parsed public key.
pub trait PublicKey: Send + Sync + fmt::Debug {
    /// Deterministic byte encoding of the key, independent of the form it was
    /// submitted in.
    fn canonical_value(&self) -> Result<Vec<u8>>;

    /// Used by signatures to recover their concrete key type.
    fn as_any(&self) -> &dyn Any;
}

/// A parsed signature.
pub trait Signature: Send + Sync + fmt::Debug {
    /// Deterministic byte encoding of the signature.
    fn canonical_value(&self) -> Result<Vec<u8>>;

    /// Start verifying a message against `key`.
    ///
    /// Fails with [`VerificationError::IncompatibleKey`] when `key` was
    /// produced by a different format.
    fn verifier(&self, key: &dyn PublicKey) -> Result<Box<dyn MessageVerifier>>;
}

/// Incremental verification of one message.
pub trait MessageVerifier: Send {
    fn update(&mut self, data: &[u8]);

    /// Returns [`VerificationError::SignatureMismatch`] when the streamed
    /// message does not match the signature.
    fn finalize(self: Box<Self>) -> Result<()>;
}

/// Parses signature and key material for one format.
pub trait ArtifactFactory: Send + Sync {
    /// Format tag this factory is registered under.
    fn format(&self) -> &'static str;

    fn new_signature(&self, bytes: &[u8]) -> Result<Box<dyn Signature>>;

    fn new_public_key(&self, bytes: &[u8]) -> Result<Box<dyn PublicKey>>;
}

/// Verify an in-memory message in one go.
pub fn verify_message(signature: &dyn Signature, key: &dyn PublicKey, message: &[u8]) -> Result<()> {
    let mut verifier = signature.verifier(key)?;
    verifier.update(message);
    verifier.finalize()
}

/// Artifact factories keyed by format tag.
#[derive(Clone)]
pub struct FormatRegistry {
    factories: HashMap<&'static str, Arc<dyn ArtifactFactory>>,
}

impl FormatRegistry {
    /// Registry with no formats.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in formats.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(crate::ed25519::Ed25519phFactory));
        registry
    }

    /// Add or replace the factory for its format tag.
    pub fn register(&mut self, factory: Arc<dyn ArtifactFactory>) {
        self.factories.insert(factory.format(), factory);
    }

    pub fn get(&self, format: &str) -> Result<Arc<dyn ArtifactFactory>> {
        self.factories
            .get(format)
            .cloned()
            .ok_or_else(|| VerificationError::UnsupportedFormat(format.to_string()))
    }

    pub fn supports(&self, format: &str) -> bool {
        self.factories.contains_key(format)
    }

    /// Registered format tags, sorted.
    pub fn supported_formats(&self) -> Vec<&'static str> {
        let mut formats: Vec<_> = self.factories.keys().copied().collect();
        formats.sort_unstable();
        formats
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.supported_formats())
            .finish()
    }
}
