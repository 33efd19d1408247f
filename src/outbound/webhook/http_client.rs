use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, redirect};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::trace;

use super::hmac_signer::format_signature_header;
use crate::domain::delivery::AttemptResult;
use crate::domain::ports::DeliveryTransport;

/// Product/version token sent with every delivery.
pub const DEFAULT_USER_AGENT: &str = "Presto-Webhooks/1.0";

/// Upper bound on how much of a receiver's response body is kept.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

pub const HEADER_SIGNATURE: &str = "X-Webhook-Signature";
pub const HEADER_TIMESTAMP: &str = "X-Webhook-Timestamp";

/// Error type for HTTP client construction
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

/// HTTP transport for webhook delivery.
///
/// One call to [`DeliveryTransport::attempt`] is one POST; redirects are not
/// followed so 3xx responses reach the orchestrator verbatim.
pub struct WebhookHttpClient {
    client: Client,
    max_body_bytes: usize,
}

impl WebhookHttpClient {
    /// Create a client with the default user agent and body bound
    pub fn new() -> Result<Self, HttpClientError> {
        Self::with_settings(DEFAULT_USER_AGENT, DEFAULT_MAX_BODY_BYTES)
    }

    /// Create a client with a custom user agent and response body bound
    pub fn with_settings(user_agent: &str, max_body_bytes: usize) -> Result<Self, HttpClientError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| HttpClientError::Build(e.to_string()))?;

        Ok(Self {
            client,
            max_body_bytes,
        })
    }

    async fn exchange(
        &self,
        url: &str,
        payload: Bytes,
        signature_hex: &str,
        timestamp: &str,
    ) -> Result<(u16, String), reqwest::Error> {
        let mut response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(HEADER_SIGNATURE, format_signature_header(signature_hex))
            .header(HEADER_TIMESTAMP, timestamp)
            .body(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = self.read_bounded_body(&mut response).await;

        Ok((status, body))
    }

    /// Read at most `max_body_bytes`; the rest is left unread and dropped.
    async fn read_bounded_body(&self, response: &mut Response) -> String {
        let mut buffer: Vec<u8> = Vec::new();

        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    let remaining = self.max_body_bytes - buffer.len();
                    if chunk.len() > remaining {
                        buffer.extend_from_slice(&chunk[..remaining]);
                        trace!(
                            max_size = self.max_body_bytes,
                            "Response body exceeds bound, discarding remainder"
                        );
                        break;
                    }
                    buffer.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(e) => {
                    // The status already arrived; keep what was read.
                    trace!(error = %e, "Response body read interrupted");
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buffer).into_owned()
    }
}

#[async_trait]
impl DeliveryTransport for WebhookHttpClient {
    async fn attempt(
        &self,
        url: &str,
        payload: Bytes,
        signature_hex: &str,
        timestamp: &str,
        timeout: Duration,
    ) -> AttemptResult {
        let start = Instant::now();

        let exchange = self.exchange(url, payload, signature_hex, timestamp);
        match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok((status, body))) => AttemptResult::responded(status, body, start.elapsed()),
            Ok(Err(e)) if e.is_timeout() => AttemptResult::timed_out(timeout, start.elapsed()),
            Ok(Err(e)) => AttemptResult::network_error(e.to_string(), start.elapsed()),
            Err(_) => AttemptResult::timed_out(timeout, start.elapsed()),
        }
    }
}
