use crate::feed::parser::{parse_feed, ParseError, RawFeedDocument};
use crate::shutdown::Shutdown;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

/// Default `User-Agent` header value.
pub const DEFAULT_USER_AGENT: &str = "gator";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default response body limit (10MB).
pub const DEFAULT_MAX_FEED_BYTES: usize = 10 * 1024 * 1024;

/// Errors that can occur while retrieving and decoding one feed.
///
/// Every variant carries the feed URL so a single log line identifies the
/// failing source. All of them are recoverable: the caller skips the feed
/// for this tick.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// HTTP response with non-2xx status code
    #[error("{url} returned HTTP status {status}")]
    HttpStatus { url: String, status: u16 },
    /// Request exceeded the configured timeout
    #[error("request to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },
    /// Shutdown was requested while the request was in flight
    #[error("request to {url} was cancelled")]
    Cancelled { url: String },
    /// Response body exceeded the configured size limit
    #[error("response from {url} exceeded {limit} bytes")]
    ResponseTooLarge { url: String, limit: usize },
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("incomplete response from {url}: expected {expected} bytes, received {received}")]
    IncompleteResponse {
        url: String,
        expected: u64,
        received: usize,
    },
    /// Body was not a decodable RSS document
    #[error("could not parse feed from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: ParseError,
    },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Network { url, .. }
            | FetchError::HttpStatus { url, .. }
            | FetchError::Timeout { url, .. }
            | FetchError::Cancelled { url }
            | FetchError::ResponseTooLarge { url, .. }
            | FetchError::IncompleteResponse { url, .. }
            | FetchError::Parse { url, .. } => url,
        }
    }
}

/// Settings for [`FeedFetcher`], normally taken from the config file.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_bytes: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_bytes: DEFAULT_MAX_FEED_BYTES,
        }
    }
}

/// Retrieves feed documents over HTTP.
///
/// Each fetch is a single GET: no retries, no conditional requests. The
/// body is read in full (up to `max_bytes`) before decoding.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl FeedFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self::with_client(client, settings))
    }

    /// Uses a caller-built client; the client's own `User-Agent` applies.
    pub fn with_client(client: reqwest::Client, settings: &FetchSettings) -> Self {
        Self {
            client,
            timeout: settings.timeout,
            max_bytes: settings.max_bytes,
        }
    }

    /// Fetches and decodes the feed at `url`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Cancelled`] if `shutdown` fires before the body is read
    /// - [`FetchError::Timeout`] if the whole exchange exceeds the timeout
    /// - [`FetchError::Network`], [`FetchError::HttpStatus`],
    ///   [`FetchError::ResponseTooLarge`], [`FetchError::IncompleteResponse`]
    ///   for transport problems
    /// - [`FetchError::Parse`] if the body is not an RSS document
    pub async fn fetch(&self, url: &str, shutdown: &Shutdown) -> Result<RawFeedDocument, FetchError> {
        let bytes = tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                return Err(FetchError::Cancelled { url: url.to_string() });
            }

            result = tokio::time::timeout(self.timeout, self.download(url)) => {
                result.map_err(|_| FetchError::Timeout {
                    url: url.to_string(),
                    secs: self.timeout.as_secs(),
                })??
            }
        };

        tracing::debug!(feed = %url, bytes = bytes.len(), "Downloaded feed");

        parse_feed(&bytes).map_err(|source| FetchError::Parse {
            url: url.to_string(),
            source,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let network = |source| FetchError::Network {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        read_limited_bytes(url, response, self.max_bytes).await
    }
}

async fn read_limited_bytes(
    url: &str,
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let too_large = || FetchError::ResponseTooLarge {
        url: url.to_string(),
        limit,
    };

    // Fast path: check Content-Length header
    let expected_length = response.content_length();
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(too_large());
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(too_large());
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                url: url.to_string(),
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
