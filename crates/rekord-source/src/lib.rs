//! Content sources for rekord entry material.
//!
//! # Architecture
//!
//! - [`Source`] - inline bytes or a URL, as declared by an entry
//! - [`SourceResolver`] - opens a source as a single-pass [`ByteStream`]
//! - [`HttpClient`] - the network seam used by [`DefaultResolver`]
//! - [`tee`] - bounded two-way fan-out so one stream can feed two consumers
//!
//! Nothing here buffers a whole artifact: streams are read chunk by chunk
//! and the fan-out holds at most its configured number of chunks per side.

mod error;
mod http;
mod resolver;
mod source;

pub mod tee;

pub use error::{FanOutError, Result, SourceError};
pub use http::{BoxStream, HttpClient, Timeouts};
pub use resolver::{inline_stream, ByteStream, DefaultResolver, SourceResolver};
pub use source::Source;

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
