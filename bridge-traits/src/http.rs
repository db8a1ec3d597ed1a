//! HTTP Client Abstraction
//!
//! Provides full-resource downloads that land directly in a local file, so
//! audio payloads never need to be buffered in memory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// `GET` request for a whole resource.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// Result of a completed transfer.
///
/// The body has already been written to the destination handed to
/// [`HttpClient::download_to`]; non-success statuses still report how many
/// bytes were written so callers can clean up.
#[derive(Debug, Clone)]
pub struct HttpDownload {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub bytes_written: u64,
}

impl HttpDownload {
    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if response status indicates a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if response status indicates a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Async HTTP client trait
///
/// Implementations should handle TLS, connection pooling and their own
/// transport timeouts. The core does not retry transfers itself: a failed
/// download surfaces to the caller, who may simply ask again.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest};
///
/// async fn fetch(client: &dyn HttpClient, dest: &Path) -> Result<u64> {
///     let download = client.download_to(HttpRequest::get("https://cdn.example.com/a.m4a"), dest).await?;
///     Ok(download.bytes_written)
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetch the full resource and stream its body into `destination`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network connection fails
    /// - TLS validation fails
    /// - Request times out
    /// - The destination cannot be written
    ///
    /// A response with a non-success status is *not* an error at this layer;
    /// inspect [`HttpDownload::status`].
    async fn download_to(&self, request: HttpRequest, destination: &Path) -> Result<HttpDownload>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_request_builder() {
        let request = HttpRequest::get("https://example.com/voice/abc.m4a")
            .header("User-Agent", "test")
            .timeout(Duration::from_secs(30));

        assert_eq!(request.url, "https://example.com/voice/abc.m4a");
        assert_eq!(request.headers.get("User-Agent"), Some(&"test".to_string()));
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_download_status_checks() {
        let ok = HttpDownload {
            status: 200,
            headers: HashMap::new(),
            bytes_written: 4096,
        };
        assert!(ok.is_success());
        assert!(!ok.is_client_error());

        let missing = HttpDownload {
            status: 404,
            headers: HashMap::new(),
            bytes_written: 0,
        };
        assert!(!missing.is_success());
        assert!(missing.is_client_error());
        assert!(!missing.is_server_error());
    }
}
