//! Error types for rekord-source.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("URL does not name a local file: {0}")]
    InvalidFileUrl(String),

    #[error("file source outside the allowed root: {}", .0.display())]
    OutsideFileRoot(PathBuf),

    #[error("network error: {0}")]
    Network(String),

    #[error("file I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FanOutError {
    #[error("producer aborted: {0}")]
    ProducerAborted(String),

    #[error("consumer closed before end of stream")]
    ConsumerClosed,
}

pub type Result<T> = std::result::Result<T, SourceError>;
