//! HTTP transport for remote archives and catalogs.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::translations::error::{TranslationError, TranslationResult};

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Retrieves a remote resource as a whole.
///
/// The fetcher depends on this trait rather than on `reqwest` directly so
/// that workflows can be exercised without a network.
pub trait Transport: Send + Sync {
    /// Download the full body of `url`.
    ///
    /// Anything other than `200 OK` is an error.
    fn get(&self, url: &str) -> TranslationResult<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn get(&self, url: &str) -> TranslationResult<Vec<u8>> {
        (**self).get(url)
    }
}

/// Blocking `reqwest` transport with a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with the default timeout.
    pub fn new() -> TranslationResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transport with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> TranslationResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("amadon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                TranslationError::InvalidConfig(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, timeout })
    }

    /// Configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn map_error(&self, url: &str, error: reqwest::Error) -> TranslationError {
        if error.is_timeout() {
            TranslationError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            TranslationError::DownloadFailed {
                url: url.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> TranslationResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| self.map_error(url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(TranslationError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().map_err(|e| self.map_error(url, e))?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_transport_default_timeout() {
        let transport = HttpTransport::new().unwrap();
        assert_eq!(transport.timeout().as_secs(), DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_http_transport_with_timeout() {
        let transport = HttpTransport::with_timeout(Duration::from_secs(60)).unwrap();
        assert_eq!(transport.timeout().as_secs(), 60);
    }

    #[test]
    fn test_unreachable_host_is_network_error() {
        let transport = HttpTransport::with_timeout(Duration::from_secs(2)).unwrap();
        // Port 9 on localhost is the discard service, normally closed.
        let result = transport.get("http://127.0.0.1:9/TR001.gz");
        assert!(result.unwrap_err().is_network());
    }
}
