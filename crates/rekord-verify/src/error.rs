use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid {algorithm} digest: expected {expected} hex characters, got {actual}")]
    InvalidLength {
        algorithm: &'static str,
        expected:  usize,
        actual:    usize,
    },

    #[error("invalid digest: value is not hexadecimal")]
    NotHex,

    #[error("invalid digest: missing {0}")]
    Missing(&'static str),
}

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("unsupported signature format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("public key is not a {expected} key")]
    IncompatibleKey { expected: &'static str },

    #[error("signature does not match the artifact")]
    SignatureMismatch,
}

pub type Result<T> = std::result::Result<T, VerificationError>;
