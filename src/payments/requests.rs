//! Per-operation request building and submission
//!
//! Each builder assembles the operation's parameters in the gateway's field order,
//! canonicalizes and (except for the status query) signs them. `submit` hands the
//! result to the transport and parses the typed response.

use http::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::payments::canonical::{
    canonicalize, format_timestamp, require_amount, require_code, require_invoice_date,
    require_invoice_number, require_text,
};
use crate::payments::endpoints::{endpoint_for, Operation, SIGN_HEADER};
use crate::payments::signer::Signer;
use crate::payments::traits::{Clock, GatewayTransport, TransportRequest};
use crate::payments::types::{
    GatewayEnvelope, GatewayOutcome, InvoiceDetails, MerchantConfig, ParamList, SignedRequest,
    TransactionReferenceId,
};

pub struct RequestBuilder {
    merchant: MerchantConfig,
    signer: Signer,
    transport: Arc<dyn GatewayTransport>,
    clock: Arc<dyn Clock>,
}

impl RequestBuilder {
    pub fn new(
        merchant: MerchantConfig,
        signer: Signer,
        transport: Arc<dyn GatewayTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            merchant,
            signer,
            transport,
            clock,
        }
    }

    pub fn merchant(&self) -> &MerchantConfig {
        &self.merchant
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    fn timestamp(&self) -> String {
        format_timestamp(self.clock.now(), self.merchant.timezone)
    }

    fn merchant_code(&self, operation: Operation) -> GatewayResult<u64> {
        require_code(operation, "merchantCode", self.merchant.merchant_code)
    }

    fn terminal_code(&self, operation: Operation) -> GatewayResult<u64> {
        require_code(operation, "terminalCode", self.merchant.terminal_code)
    }

    /// amount, invoiceNumber, invoiceDate, action, merchantCode, terminalCode,
    /// redirectAddress, timeStamp
    pub fn get_token(&self, invoice: &InvoiceDetails) -> GatewayResult<SignedRequest> {
        let op = Operation::GetToken;
        let params = ParamList::new()
            .with("amount", require_amount(op, invoice)?)
            .with("invoiceNumber", require_invoice_number(op, invoice)?)
            .with("invoiceDate", require_invoice_date(op, invoice)?)
            .with("action", require_text(op, "action", &self.merchant.action)?)
            .with("merchantCode", self.merchant_code(op)?)
            .with("terminalCode", self.terminal_code(op)?)
            .with(
                "redirectAddress",
                require_text(op, "redirectAddress", &self.merchant.redirect_address)?,
            )
            .with("timeStamp", self.timestamp());
        self.prepare(op, params)
    }

    /// amount, invoiceNumber, invoiceDate, merchantCode, terminalCode, timeStamp
    pub fn verify_payment(&self, invoice: &InvoiceDetails) -> GatewayResult<SignedRequest> {
        let op = Operation::VerifyPayment;
        let params = ParamList::new()
            .with("amount", require_amount(op, invoice)?)
            .with("invoiceNumber", require_invoice_number(op, invoice)?)
            .with("invoiceDate", require_invoice_date(op, invoice)?)
            .with("merchantCode", self.merchant_code(op)?)
            .with("terminalCode", self.terminal_code(op)?)
            .with("timeStamp", self.timestamp());
        self.prepare(op, params)
    }

    /// invoiceNumber, invoiceDate, merchantCode, terminalCode, transactionReferenceID
    pub fn check_transaction(
        &self,
        invoice: &InvoiceDetails,
        reference: Option<&TransactionReferenceId>,
    ) -> GatewayResult<SignedRequest> {
        let op = Operation::CheckTransaction;
        let invoice_number = require_invoice_number(op, invoice)?;
        let invoice_date = require_invoice_date(op, invoice)?;
        let merchant_code = self.merchant_code(op)?;
        let terminal_code = self.terminal_code(op)?;
        let reference = reference
            .filter(|r| !r.as_str().trim().is_empty())
            .ok_or(GatewayError::MissingTransactionReference { operation: op })?;

        let params = ParamList::new()
            .with("invoiceNumber", invoice_number)
            .with("invoiceDate", invoice_date)
            .with("merchantCode", merchant_code)
            .with("terminalCode", terminal_code)
            .with("transactionReferenceID", reference.as_str());
        self.prepare(op, params)
    }

    /// invoiceNumber, invoiceDate, merchantCode, terminalCode, timeStamp
    pub fn refund_payment(&self, invoice: &InvoiceDetails) -> GatewayResult<SignedRequest> {
        let op = Operation::RefundPayment;
        let params = ParamList::new()
            .with("invoiceNumber", require_invoice_number(op, invoice)?)
            .with("invoiceDate", require_invoice_date(op, invoice)?)
            .with("merchantCode", self.merchant_code(op)?)
            .with("terminalCode", self.terminal_code(op)?)
            .with("timeStamp", self.timestamp());
        self.prepare(op, params)
    }

    fn prepare(&self, operation: Operation, params: ParamList) -> GatewayResult<SignedRequest> {
        let canonical = canonicalize(&params)?;
        let signature = if operation.is_signed() {
            Some(self.signer.sign(&canonical)?)
        } else {
            None
        };

        Ok(SignedRequest {
            operation,
            endpoint: endpoint_for(operation, self.merchant.refund_endpoint),
            params,
            canonical,
            signature,
        })
    }

    /// Sends a prepared request and parses the gateway's answer.
    pub async fn submit<T>(&self, request: SignedRequest) -> GatewayResult<GatewayOutcome<T>>
    where
        T: DeserializeOwned,
    {
        let request_id = Uuid::new_v4();
        let operation = request.operation;

        info!(
            "Sending {} request: request_id={}, endpoint={}, signed={}",
            operation,
            request_id,
            request.endpoint,
            request.signature.is_some()
        );

        let mut headers = Vec::new();
        if let Some(signature) = request.signature {
            headers.push((SIGN_HEADER.to_string(), signature));
        }

        let transport_request = TransportRequest {
            operation,
            url: request.endpoint.to_string(),
            method: Method::POST,
            headers,
            body: request.params,
            encode_as_json: true,
        };

        let body = self.transport.send(transport_request).await.map_err(|e| {
            error!(
                "{} request failed: request_id={}, error={}",
                operation, request_id, e
            );
            e
        })?;

        debug!(
            "{} response received: request_id={}, bytes={}",
            operation,
            request_id,
            body.len()
        );

        let outcome = parse_response::<T>(operation, &body)?;
        match &outcome {
            GatewayOutcome::Approved(_) => {
                info!("{} approved: request_id={}", operation, request_id)
            }
            GatewayOutcome::Rejected { message } => warn!(
                "{} rejected by gateway: request_id={}, message={}",
                operation, request_id, message
            ),
        }
        Ok(outcome)
    }
}

/// Parses a gateway body into an outcome.
///
/// Unknown fields are ignored; a body without `IsSuccess` is malformed.
pub fn parse_response<T>(operation: Operation, body: &str) -> GatewayResult<GatewayOutcome<T>>
where
    T: DeserializeOwned,
{
    let envelope: GatewayEnvelope<T> = serde_json::from_str(body).map_err(|e| {
        error!("Failed to parse {} response: {}", operation, e);
        GatewayError::malformed_response(operation, format!("Invalid response format: {}", e))
    })?;

    if envelope.is_success {
        Ok(GatewayOutcome::Approved(envelope.body))
    } else {
        Ok(GatewayOutcome::Rejected {
            message: envelope.message.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::traits::FixedClock;
    use crate::payments::types::{ParamValue, TokenResponse};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rsa::RsaPrivateKey;

    struct NoTransport;

    #[async_trait]
    impl GatewayTransport for NoTransport {
        async fn send(&self, request: TransportRequest) -> GatewayResult<String> {
            Err(GatewayError::transport_error(request.operation, "offline"))
        }
    }

    fn create_test_builder() -> RequestBuilder {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 6, 30, 0).unwrap());
        RequestBuilder::new(
            MerchantConfig::new(123, 456, "https://shop.example/back"),
            Signer::new(key),
            Arc::new(NoTransport),
            Arc::new(clock),
        )
    }

    fn invoice() -> InvoiceDetails {
        InvoiceDetails {
            amount: Some(50000),
            invoice_number: Some(ParamValue::from("INV-1")),
            invoice_date: Some("2024/01/01 10:00:00".to_string()),
        }
    }

    fn names(request: &SignedRequest) -> Vec<&str> {
        request.params.names().collect()
    }

    #[test]
    fn test_get_token_field_order_and_body() {
        let builder = create_test_builder();
        let request = builder.get_token(&invoice()).unwrap();
        assert_eq!(
            names(&request),
            vec![
                "amount",
                "invoiceNumber",
                "invoiceDate",
                "action",
                "merchantCode",
                "terminalCode",
                "redirectAddress",
                "timeStamp"
            ]
        );
        assert_eq!(
            String::from_utf8(request.canonical.clone()).unwrap(),
            r#"{"amount":50000,"invoiceNumber":"INV-1","invoiceDate":"2024\/01\/01 10:00:00","action":"1003","merchantCode":123,"terminalCode":456,"redirectAddress":"https:\/\/shop.example\/back","timeStamp":"2024\/01\/01 10:00:00"}"#
        );
        let signature = request.signature.as_deref().unwrap();
        assert!(builder.signer().verify(&request.canonical, signature).is_ok());
    }

    #[test]
    fn test_verify_and_refund_field_order() {
        let builder = create_test_builder();
        let verify = builder.verify_payment(&invoice()).unwrap();
        assert_eq!(
            names(&verify),
            vec!["amount", "invoiceNumber", "invoiceDate", "merchantCode", "terminalCode", "timeStamp"]
        );
        let refund = builder.refund_payment(&invoice()).unwrap();
        assert_eq!(
            names(&refund),
            vec!["invoiceNumber", "invoiceDate", "merchantCode", "terminalCode", "timeStamp"]
        );
        assert!(verify.signature.is_some());
        assert!(refund.signature.is_some());
    }

    #[test]
    fn test_check_transaction_is_unsigned() {
        let builder = create_test_builder();
        let reference = TransactionReferenceId::new("637000000000000001");
        let request = builder
            .check_transaction(&invoice(), Some(&reference))
            .unwrap();
        assert!(request.signature.is_none());
        assert_eq!(
            names(&request),
            vec!["invoiceNumber", "invoiceDate", "merchantCode", "terminalCode", "transactionReferenceID"]
        );
    }

    #[test]
    fn test_check_transaction_requires_reference() {
        let builder = create_test_builder();
        let err = builder.check_transaction(&invoice(), None).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::MissingTransactionReference {
                operation: Operation::CheckTransaction
            }
        ));
    }

    #[test]
    fn test_missing_invoice_fields() {
        let builder = create_test_builder();
        let mut incomplete = invoice();
        incomplete.invoice_date = None;
        assert!(matches!(
            builder.get_token(&incomplete),
            Err(GatewayError::IncompleteRequest {
                field: "invoiceDate",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_merchant_code_is_incomplete() {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let builder = RequestBuilder::new(
            MerchantConfig::new(0, 456, "https://shop.example/back"),
            Signer::new(key),
            Arc::new(NoTransport),
            Arc::new(crate::payments::traits::SystemClock),
        );
        assert!(matches!(
            builder.verify_payment(&invoice()),
            Err(GatewayError::IncompleteRequest {
                field: "merchantCode",
                ..
            })
        ));
    }

    #[test]
    fn test_parse_response_outcomes() {
        let approved: GatewayOutcome<TokenResponse> =
            parse_response(Operation::GetToken, r#"{"IsSuccess":true,"Token":"abc123"}"#).unwrap();
        assert_eq!(
            approved.approved().and_then(|r| r.token),
            Some("abc123".to_string())
        );

        let rejected: GatewayOutcome<TokenResponse> = parse_response(
            Operation::GetToken,
            r#"{"IsSuccess":false,"Message":"Invalid terminal"}"#,
        )
        .unwrap();
        assert_eq!(rejected.rejection_message(), Some("Invalid terminal"));
    }

    #[test]
    fn test_parse_response_malformed() {
        let err = parse_response::<TokenResponse>(Operation::GetToken, "<html>502</html>").unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse { .. }));

        let err = parse_response::<TokenResponse>(Operation::GetToken, r#"{"Token":"x"}"#).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_submit_surfaces_transport_error() {
        let builder = create_test_builder();
        let request = builder.get_token(&invoice()).unwrap();
        let err = builder.submit::<TokenResponse>(request).await.unwrap_err();
        assert!(matches!(err, GatewayError::TransportError { .. }));
    }
}
