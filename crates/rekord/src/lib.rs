//! The `rekord` v0.0.1 entry type for a transparency log.
//!
//! A rekord entry binds an artifact, a detached signature over it and the
//! signer's public key. Each may be inline or referenced by URL.
//!
//! # Lifecycle
//!
//! 1. [`RekordEntry::unmarshal`] decodes and validates a [`ProposedEntry`] with no I/O
//! 2. [`RekordEntry::fetch_external_entities`] resolves all three sources
//!    concurrently, streams the artifact once into a digest and a signature
//!    verifier, and checks any declared digest
//! 3. [`RekordEntry::canonicalize`] emits deterministic JSON holding only
//!    the canonical key, the signature and the digest
//! 4. [`RekordEntry::index_keys`] yields lookup keys for the search index
//!
//! A successful fetch is cached; later calls never touch a source again.
//!
//! # Example
//!
//! ```no_run
//! use rekord::{EntryContext, ProposedEntry, RekordEntry};
//! use rekord_source::DefaultResolver;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(body: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let context = EntryContext::new(DefaultResolver::reqwest()?);
//! let mut entry = RekordEntry::unmarshal(&ProposedEntry::from_json(body)?, context)?;
//!
//! let canonical = entry.canonicalize(&CancellationToken::new()).await?;
//! let keys = entry.index_keys().await;
//! # let _ = (canonical, keys);
//! # Ok(())
//! # }
//! ```

mod canonical;
mod entry;
mod error;
mod fetch;
mod options;
mod schema;
mod validate;

pub use entry::{EntryContext, FetchStatus, LogEntry, RekordEntry};
pub use error::{EntryError, Material, Result, ValidationError};
pub use options::FetchOptions;
pub use schema::{DataSection, DeclaredHash, Origin, ProposedEntry, RekordSpec, SignatureSection, API_VERSION, KIND};
pub use validate::ValidatedSpec;
