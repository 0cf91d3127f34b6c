//! Collaborator trait definitions
//!
//! The protocol engine reaches the network, the key store and the wall clock only
//! through these traits, so each can be swapped (stubs in tests, a different HTTP
//! stack in production).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::Method;
use rsa::RsaPrivateKey;
use std::path::Path;

use crate::error::GatewayResult;
use crate::payments::endpoints::Operation;
use crate::payments::types::ParamList;

/// One outbound call as the transport receives it.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Operation the call belongs to, for error context
    pub operation: Operation,
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    /// Body parameters, in signing order
    pub body: ParamList,
    /// Send the body as JSON rather than a form
    pub encode_as_json: bool,
}

impl TransportRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Transport used to reach the gateway
///
/// Implementations own serialization on the wire, TLS, timeouts and any
/// low-level retry policy. They return the raw response body.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    /// Send a request and return the raw response body
    ///
    /// # Errors
    /// * `GatewayError::TransportError` - network, timeout or TLS failure
    async fn send(&self, request: TransportRequest) -> GatewayResult<String>;
}

/// Loads the merchant's private key
pub trait KeyLoader: Send + Sync {
    /// # Errors
    /// * `GatewayError::KeyLoadError` - the source cannot be read or parsed
    fn load(&self, source: &Path) -> GatewayResult<RsaPrivateKey>;
}

/// Source of the current instant for `timeStamp` fields
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
