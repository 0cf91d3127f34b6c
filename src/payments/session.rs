//! Payment session orchestration
//!
//! A `PaymentSession` owns the merchant identity, the signing key, the invoice and
//! whatever the gateway has handed back so far (token, transaction reference). All
//! mutable state sits behind one async mutex; the lock is held across each gateway
//! call so two callers can never race to issue two tokens.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::payments::callback::BankCallback;
use crate::payments::endpoints::{redirect_url, Operation};
use crate::payments::lifecycle::{FollowUp, Lifecycle, LifecycleState, TokenAction};
use crate::payments::requests::RequestBuilder;
use crate::payments::signer::Signer;
use crate::payments::traits::{Clock, GatewayTransport, SystemClock};
use crate::payments::types::{
    CheckTransactionResponse, GatewayOutcome, InvoiceDetails, MerchantConfig, ParamValue,
    PaymentToken, RefundResponse, TokenResponse, TransactionReferenceId, VerifyResponse,
};

#[derive(Debug, Default)]
struct SessionState {
    lifecycle: Lifecycle,
    invoice: InvoiceDetails,
    token: Option<PaymentToken>,
    transaction_reference: Option<TransactionReferenceId>,
    /// Set once the first request leaves; the invoice is frozen from then on
    invoice_locked: bool,
}

impl SessionState {
    fn ensure_unlocked(&self, field: &'static str) -> GatewayResult<()> {
        if self.invoice_locked {
            return Err(GatewayError::InvoiceLocked { field });
        }
        Ok(())
    }

    fn capture_reference(&mut self, reference: Option<&ParamValue>) {
        if let Some(value) = reference.filter(|v| !v.is_blank()) {
            let reference = TransactionReferenceId::new(value.to_string());
            debug!("Captured transaction reference {}", reference);
            self.transaction_reference = Some(reference);
        }
    }
}

pub struct PaymentSession {
    requests: RequestBuilder,
    state: Mutex<SessionState>,
}

impl PaymentSession {
    /// Create a session that timestamps requests with the system clock
    pub fn new(merchant: MerchantConfig, signer: Signer, transport: Arc<dyn GatewayTransport>) -> Self {
        Self::with_clock(merchant, signer, transport, Arc::new(SystemClock))
    }

    /// Create a session with an explicit clock
    pub fn with_clock(
        merchant: MerchantConfig,
        signer: Signer,
        transport: Arc<dyn GatewayTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        info!(
            "Payment session created: merchant_code={}, terminal_code={}",
            merchant.merchant_code, merchant.terminal_code
        );
        Self {
            requests: RequestBuilder::new(merchant, signer, transport, clock),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Merchant identity the session signs for.
    pub fn merchant(&self) -> &MerchantConfig {
        self.requests.merchant()
    }

    /// Sets the invoice amount in rials. Fails once a request has been sent.
    pub async fn set_amount(&self, amount: u64) -> GatewayResult<()> {
        if amount == 0 {
            return Err(GatewayError::invalid_invoice("amount", "must be positive"));
        }
        let mut state = self.state.lock().await;
        state.ensure_unlocked("amount")?;
        state.invoice.amount = Some(amount);
        Ok(())
    }

    /// Sets the merchant-unique invoice number.
    pub async fn set_invoice_number(&self, invoice_number: impl Into<ParamValue>) -> GatewayResult<()> {
        let invoice_number = invoice_number.into();
        if invoice_number.is_blank() {
            return Err(GatewayError::invalid_invoice("invoiceNumber", "must not be empty"));
        }
        let mut state = self.state.lock().await;
        state.ensure_unlocked("invoiceNumber")?;
        state.invoice.invoice_number = Some(invoice_number);
        Ok(())
    }

    /// Sets the invoice date; it must be sent identically on every call.
    pub async fn set_invoice_date(&self, invoice_date: impl Into<String>) -> GatewayResult<()> {
        let invoice_date = invoice_date.into();
        if invoice_date.trim().is_empty() {
            return Err(GatewayError::invalid_invoice("invoiceDate", "must not be empty"));
        }
        let mut state = self.state.lock().await;
        state.ensure_unlocked("invoiceDate")?;
        state.invoice.invoice_date = Some(invoice_date);
        Ok(())
    }

    /// Records the reference the bank returned for the completed payment.
    pub async fn set_transaction_reference_id(&self, reference: TransactionReferenceId) {
        self.state.lock().await.transaction_reference = Some(reference);
    }

    /// Takes the transaction reference from the bank's return redirect.
    ///
    /// The callback's invoice number and date, when present, must match the
    /// session's invoice.
    pub async fn apply_callback(&self, callback: &BankCallback) -> GatewayResult<()> {
        let mut state = self.state.lock().await;

        if let (Some(theirs), Some(ours)) = (&callback.invoice_number, &state.invoice.invoice_number) {
            if *theirs != ours.to_string() {
                warn!("Callback invoice number {} does not match {}", theirs, ours);
                return Err(GatewayError::malformed_callback(format!(
                    "invoice number {} does not match session invoice {}",
                    theirs, ours
                )));
            }
        }
        if let (Some(theirs), Some(ours)) = (&callback.invoice_date, &state.invoice.invoice_date) {
            if theirs != ours {
                warn!("Callback invoice date {} does not match {}", theirs, ours);
                return Err(GatewayError::malformed_callback(format!(
                    "invoice date {} does not match session invoice {}",
                    theirs, ours
                )));
            }
        }

        info!(
            "Bank callback applied: transaction_reference={}",
            callback.transaction_reference_id
        );
        state.transaction_reference = Some(callback.transaction_reference_id.clone());
        Ok(())
    }

    /// Obtains a payment token, issuing GetToken at most once per session.
    pub async fn request_token(&self) -> GatewayResult<GatewayOutcome<PaymentToken>> {
        let mut state = self.state.lock().await;
        self.request_token_locked(&mut state).await
    }

    async fn request_token_locked(
        &self,
        state: &mut SessionState,
    ) -> GatewayResult<GatewayOutcome<PaymentToken>> {
        if state.lifecycle.begin_token_request() == TokenAction::ReuseCached {
            if let Some(token) = &state.token {
                debug!("Reusing cached payment token");
                return Ok(GatewayOutcome::Approved(token.clone()));
            }
        }

        let request = match self.requests.get_token(&state.invoice) {
            Ok(request) => request,
            Err(e) => {
                state.lifecycle.token_request_failed();
                return Err(e);
            }
        };

        state.invoice_locked = true;
        let outcome = match self.requests.submit::<TokenResponse>(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                state.lifecycle.token_request_failed();
                return Err(e);
            }
        };

        match outcome {
            GatewayOutcome::Approved(TokenResponse { token: Some(token) }) if !token.trim().is_empty() => {
                let token = PaymentToken::new(token);
                state.token = Some(token.clone());
                state.lifecycle.token_issued();
                info!("Payment token issued");
                Ok(GatewayOutcome::Approved(token))
            }
            GatewayOutcome::Approved(_) => {
                state.lifecycle.token_request_failed();
                Err(GatewayError::malformed_response(
                    Operation::GetToken,
                    "successful response carried no Token",
                ))
            }
            GatewayOutcome::Rejected { message } => {
                state.lifecycle.token_request_failed();
                Ok(GatewayOutcome::Rejected { message })
            }
        }
    }

    /// Returns the hosted payment page URL, requesting a token first if none is held.
    pub async fn redirect(&self) -> GatewayResult<String> {
        let mut state = self.state.lock().await;
        let token = self
            .request_token_locked(&mut state)
            .await?
            .into_result(Operation::GetToken)?;
        state.lifecycle.redirected();
        Ok(redirect_url(token.as_str()))
    }

    /// Confirms a completed payment with the gateway. Repeatable.
    pub async fn verify_payment(&self) -> GatewayResult<GatewayOutcome<VerifyResponse>> {
        let mut state = self.state.lock().await;
        let request = self.requests.verify_payment(&state.invoice)?;
        state.invoice_locked = true;

        let outcome = self.requests.submit::<VerifyResponse>(request).await?;
        if let GatewayOutcome::Approved(response) = &outcome {
            state.capture_reference(response.transaction_reference_id.as_ref());
            state.lifecycle.record(FollowUp::Verified);
        }
        Ok(outcome)
    }

    /// Queries the transaction status. Unsigned; needs a transaction reference.
    pub async fn check_transaction(&self) -> GatewayResult<GatewayOutcome<CheckTransactionResponse>> {
        let mut state = self.state.lock().await;
        let request = self
            .requests
            .check_transaction(&state.invoice, state.transaction_reference.as_ref())?;
        state.invoice_locked = true;

        let outcome = self.requests.submit::<CheckTransactionResponse>(request).await?;
        if let GatewayOutcome::Approved(response) = &outcome {
            state.capture_reference(response.transaction_reference_id.as_ref());
            state.lifecycle.record(FollowUp::Checked);
        }
        Ok(outcome)
    }

    /// Asks the gateway to reverse the payment for this invoice.
    pub async fn refund_payment(&self) -> GatewayResult<GatewayOutcome<RefundResponse>> {
        let mut state = self.state.lock().await;
        let request = self.requests.refund_payment(&state.invoice)?;
        state.invoice_locked = true;

        let outcome = self.requests.submit::<RefundResponse>(request).await?;
        if outcome.is_approved() {
            state.lifecycle.record(FollowUp::Refunded);
        }
        Ok(outcome)
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> LifecycleState {
        self.state.lock().await.lifecycle.state()
    }

    pub async fn has_completed(&self, follow_up: FollowUp) -> bool {
        self.state.lock().await.lifecycle.has_completed(follow_up)
    }

    /// The issued payment token, if any.
    pub async fn token(&self) -> Option<PaymentToken> {
        self.state.lock().await.token.clone()
    }

    pub async fn transaction_reference_id(&self) -> Option<TransactionReferenceId> {
        self.state.lock().await.transaction_reference.clone()
    }

    /// Snapshot of the invoice as it will be sent.
    pub async fn invoice(&self) -> InvoiceDetails {
        self.state.lock().await.invoice.clone()
    }
}
