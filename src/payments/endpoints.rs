//! Fixed gateway endpoints and the catalogue of gateway operations.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const GET_TOKEN_URL: &str = "https://pep.shaparak.ir/Api/v1/Payment/GetToken";

/// Hosted payment page; the token goes in the `n` query parameter.
pub const PAYMENT_GATEWAY_URL: &str = "https://pep.shaparak.ir/payment.aspx";

pub const CHECK_TRANSACTION_URL: &str =
    "https://pep.shaparak.ir/Api/v1/Payment/CheckTransactionResult";

pub const VERIFY_PAYMENT_URL: &str = "https://pep.shaparak.ir/Api/v1/Payment/VerifyPayment";

pub const REFUND_PAYMENT_URL: &str = "https://pep.shaparak.ir/Api/v1/Payment/RefundPayment";

/// Name of the header carrying the base64 signature.
pub const SIGN_HEADER: &str = "Sign";

/// Default action code for a purchase.
pub const DEFAULT_ACTION: &str = "1003";

/// A request the gateway accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    GetToken,
    VerifyPayment,
    CheckTransaction,
    RefundPayment,
}

impl Operation {
    /// Every operation except the status query carries a `Sign` header.
    pub fn is_signed(self) -> bool {
        !matches!(self, Operation::CheckTransaction)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::GetToken => "GetToken",
            Operation::VerifyPayment => "VerifyPayment",
            Operation::CheckTransaction => "CheckTransaction",
            Operation::RefundPayment => "RefundPayment",
        };
        f.write_str(name)
    }
}

/// Where refund requests are posted.
///
/// The established integration posts refunds to the verify endpoint even though
/// the gateway also publishes a refund URL. Which one the bank actually expects
/// has not been confirmed, so the observed behaviour stays the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RefundEndpoint {
    #[default]
    VerifyPayment,
    Dedicated,
}

/// Resolves the URL an operation is posted to.
pub fn endpoint_for(operation: Operation, refund: RefundEndpoint) -> &'static str {
    match operation {
        Operation::GetToken => GET_TOKEN_URL,
        Operation::VerifyPayment => VERIFY_PAYMENT_URL,
        Operation::CheckTransaction => CHECK_TRANSACTION_URL,
        Operation::RefundPayment => match refund {
            RefundEndpoint::VerifyPayment => VERIFY_PAYMENT_URL,
            RefundEndpoint::Dedicated => REFUND_PAYMENT_URL,
        },
    }
}

/// Builds the hosted payment page URL for a token.
pub fn redirect_url(token: &str) -> String {
    format!("{}?n={}", PAYMENT_GATEWAY_URL, token)
}
