//! HTTP transport backed by reqwest

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::payments::canonical::canonicalize;
use crate::payments::endpoints::Operation;
use crate::payments::traits::{GatewayTransport, TransportRequest};

/// HTTP transport configuration
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Request timeout
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("pasargad-gateway/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Sends gateway requests over HTTPS.
///
/// Requests are never retried here: every call except the status query is
/// signed and changes state at the bank.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| {
                GatewayError::config_error(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

fn map_send_error(operation: Operation, err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::timeout_error(operation, format!("Request timed out: {}", err))
    } else {
        GatewayError::transport_error(operation, format!("Request error: {}", err))
    }
}

fn encode_body(request: &TransportRequest) -> GatewayResult<(Vec<u8>, &'static str)> {
    if request.encode_as_json {
        return Ok((canonicalize(&request.body)?, "application/json"));
    }

    let mut form = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in request.body.iter() {
        form.append_pair(name, &value.to_string());
    }
    Ok((form.finish().into_bytes(), "application/x-www-form-urlencoded"))
}

#[async_trait]
impl GatewayTransport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> GatewayResult<String> {
        let operation = request.operation;
        let (body, content_type) = encode_body(&request)?;

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .header(CONTENT_TYPE, content_type)
            .body(body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_send_error(operation, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_send_error(operation, e))?;

        if status.is_success() {
            debug!("{} HTTP {}", operation, status);
            return Ok(text);
        }

        if text.trim().is_empty() {
            error!("{} failed with HTTP {} and an empty body", operation, status);
            return Err(GatewayError::transport_error(
                operation,
                format!("HTTP {}", status),
            ));
        }

        // The gateway reports some rejections with a non-2xx status and a normal body.
        warn!("{} returned HTTP {}; passing body on for parsing", operation, status);
        Ok(text)
    }
}
