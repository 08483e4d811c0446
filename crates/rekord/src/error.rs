//! Error types for rekord.

use std::fmt;
use std::time::Duration;

use rekord_source::{FanOutError, SourceError};
use rekord_verify::{DigestError, VerificationError};
use thiserror::Error;

/// Which piece of entry material an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Material {
    Artifact,
    Signature,
    PublicKey,
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Material::Artifact => write!(f, "data"),
            Material::Signature => write!(f, "signature"),
            Material::PublicKey => write!(f, "publicKey"),
        }
    }
}

/// Structural problems with a proposed entry. Raised before any I/O.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("exactly one of 'content' or 'url' must be specified for {0}")]
    AmbiguousOrEmptySource(Material),

    #[error("invalid value for hash: {0}")]
    InvalidDigest(#[from] DigestError),

    #[error("malformed entry: {0}")]
    Malformed(String),

    #[error("cannot unmarshal entry of kind '{0}' as rekord")]
    UnsupportedKind(String),

    #[error("unsupported rekord API version '{0}'")]
    UnsupportedVersion(String),
}

#[derive(Debug, Error)]
pub enum EntryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("unable to read {material}: {source}")]
    SourceUnavailable {
        material: Material,
        #[source]
        source:   SourceError,
    },

    #[error("{material} exceeds the {limit} byte limit")]
    MaterialTooLarge { material: Material, limit: usize },

    #[error("verification capability error: {0}")]
    VerificationCapability(#[source] VerificationError),

    #[error("digest mismatch: declared {declared}, computed {computed}")]
    DigestMismatch { declared: String, computed: String },

    #[error("signature verification failed: {0}")]
    VerificationFailed(#[source] VerificationError),

    #[error("artifact stream failed: {0}")]
    Pipe(#[from] FanOutError),

    #[error("entry has not been fetched and verified")]
    NotVerified,

    #[error("fetch cancelled")]
    Cancelled,

    #[error("fetch timed out after {0:?}")]
    TimedOut(Duration),

    #[error("failed to encode canonical entry: {0}")]
    Encode(#[from] serde_json::Error),
}

impl EntryError {
    /// Whether this error means the submitted material is inconsistent, as
    /// opposed to unavailable or malformed.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            EntryError::DigestMismatch { .. } | EntryError::VerificationFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EntryError>;
