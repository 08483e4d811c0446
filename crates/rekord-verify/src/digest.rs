//! Algorithm-tagged digest values.

use std::fmt;
use std::str::FromStr;

use crate::error::DigestError;
use crate::hasher::{AnyHasher, Sha256Hasher, Sha512Hasher};

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DigestAlgorithm {
    /// SHA-256, used for every computed digest unless the caller declared otherwise.
    #[default]
    Sha256,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Get the digest length in bytes for this algorithm.
    pub fn digest_length(&self) -> usize {
        match self {
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    /// Get the string representation of this algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }

    /// Fresh incremental hasher for this algorithm.
    pub fn hasher(&self) -> AnyHasher {
        match self {
            DigestAlgorithm::Sha256 => AnyHasher::Sha256(Sha256Hasher::new()),
            DigestAlgorithm::Sha512 => AnyHasher::Sha512(Sha512Hasher::new()),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "sha512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(DigestError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// A digest value: algorithm plus lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: DigestAlgorithm,
    value:     String,
}

impl Digest {
    /// Parse a declared digest, checking the value is well-formed hex of the
    /// algorithm's length. The stored value is lowercased.
    pub fn parse(algorithm: &str, value: &str) -> Result<Self, DigestError> {
        let algorithm = algorithm.parse::<DigestAlgorithm>()?;
        let expected = algorithm.digest_length() * 2;
        if value.len() != expected {
            return Err(DigestError::InvalidLength {
                algorithm: algorithm.as_str(),
                expected,
                actual: value.len(),
            });
        }
        if !value.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DigestError::NotHex);
        }

        Ok(Self {
            algorithm,
            value: value.to_ascii_lowercase(),
        })
    }

    /// Wrap raw digest output.
    pub fn from_bytes(algorithm: DigestAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            value: hex::encode(bytes),
        }
    }

    /// One-shot digest of an in-memory buffer.
    pub fn compute(algorithm: DigestAlgorithm, data: &[u8]) -> Self {
        let bytes = match algorithm {
            DigestAlgorithm::Sha256 => Sha256Hasher::digest(data),
            DigestAlgorithm::Sha512 => Sha512Hasher::digest(data),
        };
        Self::from_bytes(algorithm, &bytes)
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Lowercase hex value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Same algorithm and same value, compared case-insensitively.
    pub fn matches(&self, other: &Digest) -> bool {
        self.algorithm == other.algorithm && self.value.eq_ignore_ascii_case(&other.value)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.value)
    }
}
