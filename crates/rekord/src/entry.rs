use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use rekord_source::SourceResolver;
use rekord_verify::{Digest, FormatRegistry, Sha256Hasher};
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::canonical;
use crate::error::{EntryError, Result, ValidationError};
use crate::fetch::{self, Verified};
use crate::options::FetchOptions;
use crate::schema::{ProposedEntry, RekordSpec, API_VERSION, KIND};

/// What the log's entry-type registry dispatches through.
pub trait LogEntry {
    fn kind(&self) -> &'static str;

    /// Schema revision of this entry type.
    fn api_version(&self) -> &'static str;

    fn validate(&self) -> std::result::Result<(), ValidationError>;

    /// Lookup keys for the search index. Never fails; problems yield an
    /// empty set.
    fn index_keys(&mut self) -> impl Future<Output = BTreeSet<String>> + Send;

    /// Deterministic bytes to insert into the log.
    fn canonicalize(&mut self, cancel: &CancellationToken) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Collaborators an entry fetches and verifies with.
pub struct EntryContext<R> {
    resolver: Arc<R>,
    formats:  Arc<FormatRegistry>,
    options:  FetchOptions,
}

impl<R> Clone for EntryContext<R> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            formats:  Arc::clone(&self.formats),
            options:  self.options.clone(),
        }
    }
}

impl<R: SourceResolver> EntryContext<R> {
    /// Context with the built-in formats and default options.
    pub fn new(resolver: R) -> Self {
        Self::shared(Arc::new(resolver))
    }

    pub fn shared(resolver: Arc<R>) -> Self {
        Self {
            resolver,
            formats: Arc::new(FormatRegistry::default()),
            options: FetchOptions::default(),
        }
    }

    pub fn with_formats(mut self, formats: impl Into<Arc<FormatRegistry>>) -> Self {
        self.formats = formats.into();
        self
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }
}

/// Where an entry is in its fetch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Unfetched,
    /// A fetch started and has not completed. Seen only when a fetch
    /// future was dropped before finishing; retried like `Failed`.
    Fetching,
    /// Terminal. Further fetches are no-ops.
    Fetched,
    /// The last fetch failed. The next fetch starts over.
    Failed,
}

enum FetchState {
    Unfetched,
    Fetching,
    Fetched(Verified),
    Failed,
}

impl FetchState {
    fn status(&self) -> FetchStatus {
        match self {
            FetchState::Unfetched => FetchStatus::Unfetched,
            FetchState::Fetching => FetchStatus::Fetching,
            FetchState::Fetched(_) => FetchStatus::Fetched,
            FetchState::Failed => FetchStatus::Failed,
        }
    }
}

/// A rekord v0.0.1 entry.
pub struct RekordEntry<R> {
    spec:    RekordSpec,
    state:   FetchState,
    context: EntryContext<R>,
}

impl<R: SourceResolver> RekordEntry<R> {
    /// Decode and validate a proposed entry. No I/O happens here.
    pub fn unmarshal(proposed: &ProposedEntry, context: EntryContext<R>) -> std::result::Result<Self, ValidationError> {
        if proposed.kind != KIND {
            return Err(ValidationError::UnsupportedKind(proposed.kind.clone()));
        }
        if proposed.api_version != API_VERSION {
            return Err(ValidationError::UnsupportedVersion(proposed.api_version.clone()));
        }

        Self::from_spec(RekordSpec::decode(&proposed.spec)?, context)
    }

    /// Wrap an already decoded spec, validating it first.
    pub fn from_spec(spec: RekordSpec, context: EntryContext<R>) -> std::result::Result<Self, ValidationError> {
        spec.validate()?;
        Ok(Self {
            spec,
            state: FetchState::Unfetched,
            context,
        })
    }

    pub fn api_version(&self) -> &'static str {
        API_VERSION
    }

    pub fn spec(&self) -> &RekordSpec {
        &self.spec
    }

    pub fn status(&self) -> FetchStatus {
        self.state.status()
    }

    /// Declared or computed artifact digest, once fetched.
    pub fn digest(&self) -> Option<&Digest> {
        match &self.state {
            FetchState::Fetched(verified) => Some(&verified.digest),
            _ => None,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.spec.validate().map(|_| ())
    }

    /// Whether fetching would touch the network or filesystem.
    pub fn has_external_entities(&self) -> bool {
        !matches!(self.state, FetchState::Fetched(_)) && self.spec.references_urls()
    }

    /// Resolve all material, check the digest and verify the signature.
    ///
    /// Runs at most once successfully; afterwards it returns immediately.
    /// On failure nothing is cached and a later call retries.
    pub async fn fetch_external_entities(&mut self, cancel: &CancellationToken) -> Result<()> {
        if let FetchState::Fetched(_) = self.state {
            return Ok(());
        }

        let spec = self.spec.validate()?;
        self.state = FetchState::Fetching;

        let outcome = fetch::fetch_external_entities(
            &spec,
            self.context.resolver.as_ref(),
            &self.context.formats,
            &self.context.options,
            cancel,
        )
        .await;

        match outcome {
            Ok(verified) => {
                self.state = FetchState::Fetched(verified);
                Ok(())
            }
            Err(err) => {
                self.state = FetchState::Failed;
                Err(err)
            }
        }
    }

    /// Canonical bytes of an already fetched entry.
    ///
    /// # Errors
    ///
    /// [`EntryError::NotVerified`] unless the entry is fetched.
    pub fn canonical_form(&self) -> Result<Vec<u8>> {
        match &self.state {
            FetchState::Fetched(verified) => canonical::encode(verified, self.spec.extra_data.as_ref()),
            _ => Err(EntryError::NotVerified),
        }
    }

    /// Fetch if needed, then produce canonical bytes.
    pub async fn canonicalize(&mut self, cancel: &CancellationToken) -> Result<Vec<u8>> {
        self.fetch_external_entities(cancel).await?;
        self.canonical_form()
    }

    /// SHA-256 of the canonical public key and the artifact digest, both
    /// lowercase hex.
    pub async fn index_keys(&mut self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();

        if let Err(err) = self.fetch_external_entities(&CancellationToken::new()).await {
            error!(%err, "unable to derive index keys");
            return keys;
        }
        let FetchState::Fetched(verified) = &self.state else {
            return keys;
        };

        match verified.public_key.canonical_value() {
            Ok(key) => {
                keys.insert(hex::encode(Sha256Hasher::digest(&key)));
            }
            Err(err) => error!(%err, "unable to canonicalize public key"),
        }
        keys.insert(verified.digest.value().to_ascii_lowercase());

        keys
    }
}

impl<R: SourceResolver> LogEntry for RekordEntry<R> {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn api_version(&self) -> &'static str {
        API_VERSION
    }

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        RekordEntry::validate(self)
    }

    async fn index_keys(&mut self) -> BTreeSet<String> {
        RekordEntry::index_keys(self).await
    }

    async fn canonicalize(&mut self, cancel: &CancellationToken) -> Result<Vec<u8>> {
        RekordEntry::canonicalize(self, cancel).await
    }
}

impl<R> fmt::Debug for RekordEntry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RekordEntry")
            .field("spec", &self.spec)
            .field("status", &self.state.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rekord_source::{inline_stream, ByteStream, Source, SourceError};
    use serde_json::json;

    /// Serves inline content only.
    struct InlineOnly;

    impl SourceResolver for InlineOnly {
        async fn resolve(&self, source: &Source) -> rekord_source::Result<ByteStream> {
            match source {
                Source::Inline(bytes) => Ok(inline_stream(bytes.clone())),
                Source::Remote(url) => Err(SourceError::Network(format!("offline: {url}"))),
            }
        }
    }

    fn proposed(spec: serde_json::Value) -> ProposedEntry {
        ProposedEntry::new(spec)
    }

    fn garbage_spec() -> serde_json::Value {
        json!({
            "signature": {
                "format": "ed25519ph",
                "content": "c2ln",
                "publicKey": { "content": "a2V5" }
            },
            "data": { "content": "aGVsbG8gd29ybGQ=" }
        })
    }

    #[test]
    fn test_unmarshal_rejects_other_kinds() {
        let mut entry = proposed(garbage_spec());
        entry.kind = "hashedrekord".to_string();
        let err = RekordEntry::unmarshal(&entry, EntryContext::new(InlineOnly)).unwrap_err();
        assert_eq!(err, ValidationError::UnsupportedKind("hashedrekord".to_string()));
    }

    #[test]
    fn test_unmarshal_rejects_other_versions() {
        let mut entry = proposed(garbage_spec());
        entry.api_version = "0.0.2".to_string();
        let err = RekordEntry::unmarshal(&entry, EntryContext::new(InlineOnly)).unwrap_err();
        assert_eq!(err, ValidationError::UnsupportedVersion("0.0.2".to_string()));
    }

    #[test]
    fn test_canonical_form_requires_fetch() {
        let entry = RekordEntry::unmarshal(&proposed(garbage_spec()), EntryContext::new(InlineOnly)).unwrap();
        assert_eq!(entry.status(), FetchStatus::Unfetched);
        assert!(matches!(entry.canonical_form(), Err(EntryError::NotVerified)));
        assert!(!entry.has_external_entities());
        assert_eq!(entry.digest(), None);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retryable() {
        let mut entry =
            RekordEntry::unmarshal(&proposed(garbage_spec()), EntryContext::new(InlineOnly)).unwrap();

        let err = entry.fetch_external_entities(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, EntryError::VerificationCapability(_)));
        assert_eq!(entry.status(), FetchStatus::Failed);
        assert!(format!("{entry:?}").contains("Failed"));

        // Still failing, but attempted again rather than answered from cache.
        let err = entry.fetch_external_entities(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, EntryError::VerificationCapability(_)));
        assert!(matches!(entry.canonical_form(), Err(EntryError::NotVerified)));
    }

    #[tokio::test]
    async fn test_unknown_format_fails_fetch_not_validation() {
        let mut spec = garbage_spec();
        spec["signature"]["format"] = json!("pgp");
        let mut entry = RekordEntry::unmarshal(&proposed(spec), EntryContext::new(InlineOnly)).unwrap();

        let err = entry.fetch_external_entities(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            EntryError::VerificationCapability(rekord_verify::VerificationError::UnsupportedFormat(f)) if f == "pgp"
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let mut entry =
            RekordEntry::unmarshal(&proposed(garbage_spec()), EntryContext::new(InlineOnly)).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = entry.fetch_external_entities(&cancel).await.unwrap_err();
        assert!(matches!(err, EntryError::Cancelled));
        assert_eq!(entry.status(), FetchStatus::Failed);
    }

    #[tokio::test]
    async fn test_index_keys_empty_on_failure() {
        let mut entry =
            RekordEntry::unmarshal(&proposed(garbage_spec()), EntryContext::new(InlineOnly)).unwrap();
        assert!(entry.index_keys().await.is_empty());
    }

    #[test]
    fn test_debug_omits_collaborators() {
        let entry = RekordEntry::unmarshal(&proposed(garbage_spec()), EntryContext::new(InlineOnly)).unwrap();
        let rendered = format!("{entry:?}");
        assert!(rendered.contains("Unfetched"));
        assert!(rendered.contains("ed25519ph"));
    }
}
