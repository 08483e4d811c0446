use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::Stream;
use url::Url;

/// A boxed stream type for response bodies.
///
/// The stream yields `Result<Bytes, E>` where E is the error type of the
/// client or resolver that produced it.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Asynchronous HTTP client abstraction.
///
/// This trait provides the minimal interface needed to stream a remote
/// artifact. Implementations handle their own redirect following, timeout
/// configuration and error mapping.
///
/// # Implementations
///
/// - [`ReqwestClient`]: Production implementation using `reqwest`
/// - Mock implementations for testing
pub trait HttpClient: Send + Sync {
    /// Error type for HTTP operations.
    type Error: std::error::Error + Send + 'static;

    /// Open a streaming GET request and return the response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails (DNS failure, connection error,
    /// non-success status, etc.).
    fn stream(
        &self,
        url: &Url,
    ) -> impl Future<Output = std::result::Result<BoxStream<'static, std::result::Result<Bytes, Self::Error>>, Self::Error>>
           + Send;
}

/// Client-side timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Time allowed to establish a connection.
    ///
    /// Default: 10s
    pub connect: Duration,

    /// Time allowed for the whole request including the body.
    ///
    /// Default: None (no limit)
    pub request: Option<Duration>,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: None,
        }
    }
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use super::*;

    /// Production HTTP client implementation using reqwest.
    #[derive(Debug, Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        /// Create a new ReqwestClient with default timeouts.
        pub fn new() -> Result<Self, reqwest::Error> {
            Self::with_timeouts(Timeouts::default())
        }

        pub fn with_timeouts(timeouts: Timeouts) -> Result<Self, reqwest::Error> {
            let mut builder = reqwest::Client::builder().connect_timeout(timeouts.connect);
            if let Some(request) = timeouts.request {
                builder = builder.timeout(request);
            }
            Ok(Self {
                client: builder.build()?,
            })
        }
    }

    impl HttpClient for ReqwestClient {
        type Error = reqwest::Error;

        async fn stream(
            &self,
            url: &Url,
        ) -> std::result::Result<BoxStream<'static, std::result::Result<Bytes, Self::Error>>, Self::Error> {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await?
                .error_for_status()?;

            Ok(Box::pin(response.bytes_stream()))
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
