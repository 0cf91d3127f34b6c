#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pasargad_gateway::error::{GatewayError, GatewayResult};
use pasargad_gateway::payments::traits::FixedClock;
use pasargad_gateway::payments::{
    GatewayTransport, MerchantConfig, Operation, PaymentSession, Signer, TransportRequest,
};
use rsa::RsaPrivateKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

pub fn test_key() -> RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 1024).expect("key generation"))
        .clone()
}

pub fn test_signer() -> Signer {
    Signer::new(test_key())
}

/// Transport that answers from canned bodies and records every request.
#[derive(Default)]
pub struct StubTransport {
    responses: Mutex<HashMap<Operation, String>>,
    failures: Mutex<HashMap<Operation, String>>,
    requests: Mutex<Vec<TransportRequest>>,
    delay: Option<Duration>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn respond(self, operation: Operation, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(operation, body.to_string());
        self
    }

    pub fn fail(self, operation: Operation, message: &str) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(operation, message.to_string());
        self
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.operation == operation)
            .count()
    }
}

#[async_trait]
impl GatewayTransport for StubTransport {
    async fn send(&self, request: TransportRequest) -> GatewayResult<String> {
        let operation = request.operation;
        self.requests.lock().unwrap().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.failures.lock().unwrap().get(&operation) {
            return Err(GatewayError::transport_error(operation, message.clone()));
        }

        self.responses
            .lock()
            .unwrap()
            .get(&operation)
            .cloned()
            .ok_or_else(|| GatewayError::transport_error(operation, "no canned response"))
    }
}

pub fn merchant() -> MerchantConfig {
    MerchantConfig::new(123, 456, "https://shop.example/back")
}

/// 2024-01-01 10:00:00 at the gateway's +03:30 offset.
pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 6, 30, 0).unwrap()))
}

pub fn session_with(transport: Arc<StubTransport>, merchant: MerchantConfig) -> PaymentSession {
    PaymentSession::with_clock(merchant, test_signer(), transport, fixed_clock())
}

pub async fn invoiced_session(transport: Arc<StubTransport>) -> PaymentSession {
    let session = session_with(transport, merchant());
    session.set_amount(50000).await.unwrap();
    session.set_invoice_number("INV-1").await.unwrap();
    session
        .set_invoice_date("2024/01/01 10:00:00")
        .await
        .unwrap();
    session
}
