//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpDownload, HttpRequest},
};
use reqwest::Client;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Reqwest-based HTTP client implementation
///
/// Provides downloads with:
/// - Connection pooling via reqwest
/// - Retry with exponential backoff while no body bytes have been written
/// - TLS support by default
/// - Chunked streaming straight to disk
pub struct ReqwestHttpClient {
    client: Client,
    max_attempts: u32,
    base_delay: Duration,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(60))
    }

    /// Create a new HTTP client with custom timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .user_agent("chat-audio-core/0.1.0")
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client configuration");
                Client::new()
            });

        Self::with_client(client)
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }

    /// Override how many times a failed connection is attempted.
    pub fn with_retry(mut self, max_attempts: u32, base_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.base_delay = base_delay;
        self
    }

    /// Build reqwest request from bridge request
    fn build_request(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let mut req = self.client.get(&request.url);

        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    /// Send the request, retrying connection failures and retryable statuses.
    async fn send_with_retry(&self, request: &HttpRequest) -> Result<reqwest::Response> {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < self.max_attempts {
            debug!(
                attempt = attempt + 1,
                max_attempts = self.max_attempts,
                url = %request.url,
                "Executing HTTP request"
            );

            match self.build_request(request).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if (status >= 500 || status == 429) && attempt + 1 < self.max_attempts {
                        warn!(
                            status = status,
                            attempt = attempt + 1,
                            "HTTP request failed with retryable status"
                        );
                        last_error = Some(BridgeError::OperationFailed(format!(
                            "HTTP {} error",
                            status
                        )));
                    } else {
                        return Ok(response);
                    }
                }
                Err(e) => {
                    warn!(error = %e, attempt = attempt + 1, "HTTP request failed");

                    last_error = Some(if e.is_timeout() {
                        BridgeError::OperationFailed("Request timed out".to_string())
                    } else if e.is_connect() {
                        BridgeError::OperationFailed(format!("Connection failed: {}", e))
                    } else {
                        BridgeError::OperationFailed(e.to_string())
                    });
                }
            }

            attempt += 1;

            if attempt < self.max_attempts {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(delay_ms = delay.as_millis(), "Retrying after delay");
                sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BridgeError::OperationFailed("All retry attempts exhausted".to_string())
        }))
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn download_to(&self, request: HttpRequest, destination: &Path) -> Result<HttpDownload> {
        let mut response = self.send_with_retry(&request).await?;
        let status = response.status().as_u16();

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        if !response.status().is_success() {
            debug!(status, url = %request.url, "Skipping body of unsuccessful response");
            return Ok(HttpDownload {
                status,
                headers,
                bytes_written: 0,
            });
        }

        let mut file = fs::File::create(destination).await?;
        let mut bytes_written = 0u64;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Body transfer failed: {}", e)))?
        {
            file.write_all(&chunk).await?;
            bytes_written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;

        debug!(status, bytes_written, "Download finished");
        Ok(HttpDownload {
            status,
            headers,
            bytes_written,
        })
    }
}
