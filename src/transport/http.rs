//! # HTTP Transport
//!
//! `reqwest`-backed transport. One `Client` (and so one connection pool) is
//! shared by every call made through the transport.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use tracing::{debug, error, info};

use super::{ResponseHandle, Transport, TransportRequest};
use crate::config::ClientConfig;
use crate::error::{GrpcWebError, Result, TransportError};
use crate::metadata::Metadata;

/// Pooled HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport from client configuration.
    ///
    /// Fails if the base URL does not parse or the HTTP client cannot be
    /// built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| GrpcWebError::config_error(format!("Invalid base URL: {e}")))?;

        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .pool_idle_timeout(Duration::from_millis(config.pool_idle_timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                GrpcWebError::config_error(format!("Failed to create HTTP client: {e}"))
            })?;

        info!(
            base_url = %base_url,
            connect_timeout_ms = config.connect_timeout_ms,
            "Created gRPC-Web HTTP transport"
        );

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join the method path onto the base URL, keeping any base path prefix.
    fn endpoint(&self, path: &str) -> std::result::Result<Url, TransportError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| TransportError::InvalidRequest(format!("Invalid endpoint {joined}: {e}")))
    }

    fn header_map(
        headers: &[(String, String)],
    ) -> std::result::Result<HeaderMap, TransportError> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                TransportError::InvalidRequest(format!("Invalid header name {name}: {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::InvalidRequest(format!("Invalid value for header {name}: {e}"))
            })?;
            map.append(name, value);
        }
        Ok(map)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<ResponseHandle, TransportError> {
        let url = self.endpoint(&request.path)?;
        let headers = Self::header_map(&request.headers)?;

        debug!(url = %url, body_len = request.body.len(), "Sending gRPC-Web request");

        let response = self
            .client
            .post(url)
            .headers(headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, path = %request.path, "HTTP request failed");
                TransportError::from(e)
            })?;

        let http_status = response.status().as_u16();
        let headers = Metadata::from_pairs(response.headers().iter().map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        }));

        let body = if request.streaming {
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(TransportError::from))
                .boxed()
        } else {
            let bytes = response.bytes().await?;
            stream::once(async move { Ok(bytes) }).boxed()
        };

        Ok(ResponseHandle::new(http_status, headers, body))
    }
}
