use std::future::Future;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::{stream, TryStreamExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Result, SourceError};
use crate::http::{BoxStream, HttpClient};
use crate::source::Source;

/// Single-pass byte stream of entry material.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Turns a [`Source`] into a readable byte stream.
pub trait SourceResolver: Send + Sync {
    /// Open `source` for sequential reading.
    ///
    /// # Errors
    ///
    /// Network and filesystem failures while opening. Failures after the
    /// stream is open are reported as stream items.
    fn resolve(&self, source: &Source) -> impl Future<Output = Result<ByteStream>> + Send;
}

/// Resolver for inline content and `http(s)://` URLs over an [`HttpClient`].
///
/// `file://` URLs are refused unless a root directory is allowed with
/// [`with_file_urls`](Self::with_file_urls).
#[derive(Debug, Clone)]
pub struct DefaultResolver<C> {
    client:    C,
    file_root: Option<PathBuf>,
}

impl<C: HttpClient> DefaultResolver<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            file_root: None,
        }
    }

    /// Also serve `file://` URLs, limited to files under `root`.
    ///
    /// Paths are canonicalized before the check, so symlinks and `..`
    /// cannot leave the root.
    pub fn with_file_urls(mut self, root: impl Into<PathBuf>) -> Self {
        self.file_root = Some(root.into());
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

#[cfg(feature = "reqwest")]
impl DefaultResolver<crate::http::ReqwestClient> {
    /// Resolver backed by a default [`ReqwestClient`](crate::ReqwestClient).
    pub fn reqwest() -> std::result::Result<Self, reqwest::Error> {
        Ok(Self::new(crate::http::ReqwestClient::new()?))
    }
}

impl<C: HttpClient> SourceResolver for DefaultResolver<C> {
    async fn resolve(&self, source: &Source) -> Result<ByteStream> {
        match source {
            Source::Inline(bytes) => Ok(inline_stream(bytes.clone())),
            Source::Remote(url) => match url.scheme() {
                "http" | "https" => {
                    debug!(%url, "opening remote source");
                    let body = self.client.stream(url).await.map_err(network_error)?;
                    Ok(Box::pin(body.map_err(network_error)))
                }
                "file" => match &self.file_root {
                    Some(root) => open_file(root, url).await,
                    None => Err(SourceError::UnsupportedScheme("file".to_string())),
                },
                other => Err(SourceError::UnsupportedScheme(other.to_string())),
            },
        }
    }
}

/// Stream yielding `bytes` as a single chunk.
pub fn inline_stream(bytes: Bytes) -> ByteStream {
    Box::pin(stream::once(async move { Ok::<_, SourceError>(bytes) }))
}

async fn open_file(root: &Path, url: &Url) -> Result<ByteStream> {
    let path = url
        .to_file_path()
        .map_err(|()| SourceError::InvalidFileUrl(url.to_string()))?;
    let root = tokio::fs::canonicalize(root).await?;
    let path = tokio::fs::canonicalize(&path).await?;
    if !path.starts_with(&root) {
        warn!(path = %path.display(), root = %root.display(), "file source outside allowed root");
        return Err(SourceError::OutsideFileRoot(path));
    }

    debug!(path = %path.display(), "opening file source");
    let file = tokio::fs::File::open(&path).await?;
    Ok(Box::pin(ReaderStream::new(file).map_err(SourceError::from)))
}

fn network_error<E: std::error::Error>(e: E) -> SourceError {
    SourceError::Network(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct TestError(String);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for TestError {}

    /// Serves a fixed body split in chunks, or fails for one host.
    struct TestHttpClient {
        body:     Vec<u8>,
        requests: AtomicUsize,
    }

    impl TestHttpClient {
        fn new(body: &[u8]) -> Self {
            Self {
                body:     body.to_vec(),
                requests: AtomicUsize::new(0),
            }
        }
    }

    impl HttpClient for TestHttpClient {
        type Error = TestError;

        async fn stream(
            &self,
            url: &Url,
        ) -> std::result::Result<BoxStream<'static, std::result::Result<Bytes, Self::Error>>, Self::Error> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if url.host_str() == Some("unreachable.invalid") {
                return Err(TestError("connection refused".to_string()));
            }
            let chunks: Vec<std::result::Result<Bytes, TestError>> = self
                .body
                .chunks(3)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();
            Ok(Box::pin(stream::iter(chunks)))
        }
    }

    async fn collect(stream: ByteStream) -> Result<Vec<u8>> {
        stream
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
    }

    #[tokio::test]
    async fn test_inline_source_skips_client() {
        let resolver = DefaultResolver::new(TestHttpClient::new(b""));
        let stream = resolver
            .resolve(&Source::Inline(Bytes::from_static(b"hello world")))
            .await
            .unwrap();

        assert_eq!(collect(stream).await.unwrap(), b"hello world");
        assert_eq!(resolver.client().requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_http_source_streams_body() {
        let resolver = DefaultResolver::new(TestHttpClient::new(b"remote artifact"));
        let url = Url::parse("https://example.com/a.bin").unwrap();
        let stream = resolver.resolve(&Source::Remote(url)).await.unwrap();

        assert_eq!(collect(stream).await.unwrap(), b"remote artifact");
        assert_eq!(resolver.client().requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_http_failure_is_network_error() {
        let resolver = DefaultResolver::new(TestHttpClient::new(b""));
        let url = Url::parse("https://unreachable.invalid/a.bin").unwrap();
        let result = resolver.resolve(&Source::Remote(url)).await;

        assert!(matches!(result, Err(SourceError::Network(msg)) if msg.contains("refused")));
    }

    #[tokio::test]
    async fn test_file_urls_refused_by_default() {
        let resolver = DefaultResolver::new(TestHttpClient::new(b""));
        let url = Url::parse("file:///etc/passwd").unwrap();
        let result = resolver.resolve(&Source::Remote(url)).await;
        assert!(matches!(result, Err(SourceError::UnsupportedScheme(s)) if s == "file"));
    }

    #[tokio::test]
    async fn test_file_source_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.bin");
        std::fs::write(&path, b"from disk").unwrap();
        let url = Url::from_file_path(&path).unwrap();

        let resolver = DefaultResolver::new(TestHttpClient::new(b"")).with_file_urls(dir.path());
        let stream = resolver.resolve(&Source::Remote(url)).await.unwrap();
        assert_eq!(collect(stream).await.unwrap(), b"from disk");
    }

    #[tokio::test]
    async fn test_file_source_outside_root() {
        let root = tempfile::tempdir().unwrap();
        let mut outside = tempfile::NamedTempFile::new().unwrap();
        outside.write_all(b"private").unwrap();
        let url = Url::from_file_path(outside.path()).unwrap();

        let resolver = DefaultResolver::new(TestHttpClient::new(b"")).with_file_urls(root.path());
        let result = resolver.resolve(&Source::Remote(url)).await;
        assert!(matches!(result, Err(SourceError::OutsideFileRoot(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_cannot_escape_root() {
        let root = tempfile::tempdir().unwrap();
        let mut outside = tempfile::NamedTempFile::new().unwrap();
        outside.write_all(b"private").unwrap();
        let link = root.path().join("link");
        std::os::unix::fs::symlink(outside.path(), &link).unwrap();
        let url = Url::from_file_path(&link).unwrap();

        let resolver = DefaultResolver::new(TestHttpClient::new(b"")).with_file_urls(root.path());
        let result = resolver.resolve(&Source::Remote(url)).await;
        assert!(matches!(result, Err(SourceError::OutsideFileRoot(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_file_path(dir.path().join("absent")).unwrap();

        let resolver = DefaultResolver::new(TestHttpClient::new(b"")).with_file_urls(dir.path());
        let result = resolver.resolve(&Source::Remote(url)).await;
        assert!(matches!(result, Err(SourceError::Io(_))));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let resolver = DefaultResolver::new(TestHttpClient::new(b""));
        let url = Url::parse("ftp://example.com/a.bin").unwrap();
        let result = resolver.resolve(&Source::Remote(url)).await;
        assert!(matches!(result, Err(SourceError::UnsupportedScheme(s)) if s == "ftp"));
    }

    #[tokio::test]
    async fn test_inline_stream_single_chunk() {
        let mut stream = inline_stream(Bytes::from_static(b"abc"));
        assert_eq!(stream.next().await.unwrap().unwrap(), Bytes::from_static(b"abc"));
        assert!(stream.next().await.is_none());
    }
}
