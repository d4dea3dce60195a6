//! S3-compatible HTTP object store using reqwest.

use std::time::Duration;

use log::{trace, warn};
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT_RANGES, AUTHORIZATION, CONTENT_LENGTH, RANGE};

use super::error::StoreError;
use super::source::{ObjectStore, StoreResult, inclusive_range};

/// Environment variable holding the endpoint URL for [`HttpConfig::from_env`].
pub const ENV_ENDPOINT: &str = "OBJSTREAM_ENDPOINT";
/// Environment variable overriding the request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "OBJSTREAM_TIMEOUT_SECS";
/// Environment variable overriding the retry count.
pub const ENV_MAX_RETRIES: &str = "OBJSTREAM_MAX_RETRIES";
/// Environment variable holding a bearer token.
pub const ENV_BEARER_TOKEN: &str = "OBJSTREAM_BEARER_TOKEN";

/// Upper bound on a single retry delay.
const MAX_BACKOFF_MS: u64 = 5_000;

/// How bucket and key are mapped onto request URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Addressing {
    /// `{endpoint}/{bucket}/{key}`, the S3 path-style layout.
    #[default]
    PathStyle,
    /// `{endpoint}/{key}`; the endpoint already names the bucket (CDN, virtual host).
    BucketEndpoint,
}

/// Configuration for the HTTP object store.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL of the storage service.
    pub endpoint: String,
    /// Request timeout in seconds (default: 30).
    pub timeout_secs: u64,
    /// Maximum number of retry attempts on transient errors (default: 3).
    pub max_retries: u32,
    /// URL layout.
    pub addressing: Addressing,
    /// Authentication configuration.
    pub auth: Option<HttpAuthConfig>,
    /// Custom User-Agent header.
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            addressing: Addressing::PathStyle,
            auth: None,
            user_agent: None,
        }
    }
}

impl HttpConfig {
    /// Builds a configuration for `endpoint` with default settings.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Reads overrides from `OBJSTREAM_*` environment variables.
    ///
    /// Unset or unparsable values keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            config.endpoint = endpoint;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS).and_then(|v| v.parse().ok()) {
            config.timeout_secs = secs;
        }
        if let Some(retries) = lookup(ENV_MAX_RETRIES).and_then(|v| v.parse().ok()) {
            config.max_retries = retries;
        }
        if let Some(token) = lookup(ENV_BEARER_TOKEN) {
            config.auth = Some(HttpAuthConfig::Bearer(token));
        }
        config
    }
}

/// Authentication configuration for HTTP requests.
#[derive(Debug, Clone)]
pub enum HttpAuthConfig {
    /// Bearer token authentication.
    Bearer(String),
    /// Custom header-based authentication.
    CustomHeader {
        /// Header name (e.g., "X-API-Key")
        name: String,
        /// Header value
        value: String,
    },
}

/// Object store backed by an S3-compatible HTTP endpoint.
///
/// Sizes come from `HEAD`; fetches are `GET` requests carrying an inclusive
/// `Range` header.
pub struct HttpObjectStore {
    endpoint: Url,
    client: Client,
    config: HttpConfig,
}

impl HttpObjectStore {
    /// Creates a store for `endpoint` with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL or the client cannot be built.
    pub fn from_endpoint(endpoint: impl Into<String>) -> StoreResult<Self> {
        Self::with_config(HttpConfig::new(endpoint))
    }

    /// Creates a store with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL or the client cannot be built.
    pub fn with_config(config: HttpConfig) -> StoreResult<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| StoreError::InvalidEndpoint {
            url: config.endpoint.clone(),
            reason: e.to_string(),
        })?;

        let mut client_builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs));

        if let Some(ref ua) = config.user_agent {
            client_builder = client_builder.user_agent(ua.clone());
        } else {
            client_builder =
                client_builder.user_agent(concat!("objstream/", env!("CARGO_PKG_VERSION")));
        }

        let client = client_builder.build()?;

        Ok(Self {
            endpoint,
            client,
            config,
        })
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Builds the request URL for an object.
    pub fn object_url(&self, bucket: &str, key: &str) -> StoreResult<Url> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
            });
        }

        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| StoreError::InvalidEndpoint {
                    url: self.endpoint.to_string(),
                    reason: "cannot be a base URL".to_string(),
                })?;
            segments.pop_if_empty();
            if self.config.addressing == Addressing::PathStyle {
                segments.push(bucket);
            }
            segments.extend(key.split('/'));
        }
        Ok(url)
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.auth {
            Some(HttpAuthConfig::Bearer(token)) => {
                request.header(AUTHORIZATION, format!("Bearer {token}"))
            }
            Some(HttpAuthConfig::CustomHeader { name, value }) => request.header(name, value),
            None => request,
        }
    }

    fn check_status(response: &Response, bucket: &str, key: &str) -> StoreResult<()> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }

        if !status.is_success() {
            return Err(StoreError::Http {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown error").into(),
            });
        }

        Ok(())
    }

    /// Runs `op` until it succeeds, fails permanently, or retries run out.
    fn with_retry<T>(&self, mut op: impl FnMut() -> StoreResult<T>) -> StoreResult<T> {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay_ms = backoff_delay_ms(attempt);
                    warn!("transient store error, retry {attempt} in {delay_ms}ms: {e}");
                    std::thread::sleep(Duration::from_millis(delay_ms));
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn head_once(&self, bucket: &str, key: &str) -> StoreResult<u64> {
        let url = self.object_url(bucket, key)?;
        let response = self.apply_auth(self.client.head(url)).send()?;
        Self::check_status(&response, bucket, key)?;

        if let Some(accept_ranges) = response.headers().get(ACCEPT_RANGES) {
            if accept_ranges.to_str().map_or(true, |v| v == "none") {
                return Err(StoreError::RangeNotSupported);
            }
        }

        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| StoreError::MissingContentLength {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    fn fetch_range_once(
        &self,
        bucket: &str,
        key: &str,
        offset: u64,
        length: u64,
    ) -> StoreResult<Vec<u8>> {
        let url = self.object_url(bucket, key)?;
        let range_value = inclusive_range(offset, length);
        trace!("GET {url} {range_value}");

        let request = self.client.get(url).header(RANGE, range_value);
        let response = self.apply_auth(request).send()?;
        Self::check_status(&response, bucket, key)?;

        let partial = response.status() == StatusCode::PARTIAL_CONTENT;
        let body = response.bytes()?;

        if partial {
            return Ok(body.to_vec());
        }

        // A plain 200 carries the whole object; cut out the requested window.
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(body.len());
        let end = usize::try_from(length)
            .map_or(body.len(), |len| start.saturating_add(len))
            .min(body.len());
        Ok(body[start..end].to_vec())
    }
}

/// Exponential backoff for retry `attempt` (1-based): 100ms, 200ms, 400ms, ...
/// capped at [`MAX_BACKOFF_MS`].
fn backoff_delay_ms(attempt: u32) -> u64 {
    let factor = 1u64
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    100u64.saturating_mul(factor).min(MAX_BACKOFF_MS)
}

impl ObjectStore for HttpObjectStore {
    fn object_size(&self, bucket: &str, key: &str) -> StoreResult<u64> {
        self.with_retry(|| self.head_once(bucket, key))
    }

    fn read_range(
        &self,
        bucket: &str,
        key: &str,
        offset: u64,
        length: u64,
    ) -> StoreResult<Vec<u8>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        self.with_retry(|| self.fetch_range_once(bucket, key, offset, length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.addressing, Addressing::PathStyle);
        assert!(config.auth.is_none());
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn test_config_from_lookup() {
        let config = HttpConfig::from_lookup(|name| match name {
            ENV_ENDPOINT => Some("https://s3.example.com".to_string()),
            ENV_TIMEOUT_SECS => Some("5".to_string()),
            ENV_MAX_RETRIES => Some("not-a-number".to_string()),
            ENV_BEARER_TOKEN => Some("secret".to_string()),
            _ => None,
        });
        assert_eq!(config.endpoint, "https://s3.example.com");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.max_retries, 3);
        assert!(matches!(config.auth, Some(HttpAuthConfig::Bearer(ref t)) if t == "secret"));
    }

    #[test]
    fn test_path_style_url() {
        let store = HttpObjectStore::from_endpoint("http://localhost:9000/").unwrap();
        let url = store.object_url("logs", "2024/part 0001.bin").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/logs/2024/part%200001.bin"
        );
    }

    #[test]
    fn test_bucket_endpoint_url() {
        let config = HttpConfig {
            addressing: Addressing::BucketEndpoint,
            ..HttpConfig::new("https://cdn.example.com/data")
        };
        let store = HttpObjectStore::with_config(config).unwrap();
        assert_eq!(store.config().addressing, Addressing::BucketEndpoint);
        assert_eq!(store.config().timeout_secs, 30);
        let url = store.object_url("ignored", "chunk-0").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/data/chunk-0");
    }

    #[test]
    fn test_empty_key_rejected() {
        let store = HttpObjectStore::from_endpoint("http://localhost:9000").unwrap();
        let err = store.object_url("bucket", "").unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey { .. }));
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = HttpObjectStore::from_endpoint("not a url").err().unwrap();
        match err {
            StoreError::InvalidEndpoint { url, .. } => assert_eq!(url, "not a url"),
            other => panic!("unexpected error: {other}"),
        }

        let store = HttpObjectStore::from_endpoint("mailto:ops@example.com").unwrap();
        let err = store.object_url("bucket", "key").unwrap_err();
        assert!(matches!(err, StoreError::InvalidEndpoint { .. }));
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(backoff_delay_ms(1), 100);
        assert_eq!(backoff_delay_ms(2), 200);
        assert_eq!(backoff_delay_ms(3), 400);
        assert_eq!(backoff_delay_ms(20), MAX_BACKOFF_MS);
        assert_eq!(backoff_delay_ms(64), MAX_BACKOFF_MS);
        assert_eq!(backoff_delay_ms(u32::MAX), MAX_BACKOFF_MS);
    }

    #[test]
    fn test_transient_classification() {
        let server = StoreError::Http {
            status: 503,
            message: "Service Unavailable".into(),
        };
        let client = StoreError::Http {
            status: 403,
            message: "Forbidden".into(),
        };
        assert!(server.is_transient());
        assert!(!client.is_transient());
    }
}
