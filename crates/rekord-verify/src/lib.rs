//! Streaming digests and pluggable signature verification for rekord entries.
//!
//! Both halves consume an artifact incrementally: a [`Hasher`] and a
//! [`MessageVerifier`] are fed the same chunks as they arrive, so neither
//! needs the artifact buffered in full.
//!
//! # Example
//!
//! ```
//! use rekord_verify::{Digest, DigestAlgorithm, Hasher};
//!
//! let mut hasher = DigestAlgorithm::Sha256.hasher();
//! hasher.update(b"hello ");
//! hasher.update(b"world");
//! let digest = Digest::from_bytes(DigestAlgorithm::Sha256, &hasher.finalize());
//!
//! assert_eq!(digest, Digest::compute(DigestAlgorithm::Sha256, b"hello world"));
//! ```

pub use self::capability::{
    verify_message, ArtifactFactory, FormatRegistry, MessageVerifier, PublicKey, Signature,
};
pub use self::digest::{Digest, DigestAlgorithm};
pub use self::error::{DigestError, Result, VerificationError};
pub use self::hasher::{AnyHasher, Hasher, Sha256Hasher, Sha512Hasher};

pub mod ed25519;

mod capability;
mod digest;
mod error;
mod hasher;
