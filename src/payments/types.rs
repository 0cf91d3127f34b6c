//! Gateway request and response data structures
//!
//! Merchant and invoice data, the ordered parameter list that gets signed, and the
//! typed response bodies the gateway returns.

use chrono::{FixedOffset, Offset, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::payments::endpoints::{Operation, RefundEndpoint, DEFAULT_ACTION};

/// Minutes east of UTC for the gateway's local time (Asia/Tehran, no DST).
pub const GATEWAY_UTC_OFFSET_MINUTES: i32 = 210;

/// The gateway's local time zone as a fixed offset.
pub fn gateway_offset() -> FixedOffset {
    FixedOffset::east_opt(GATEWAY_UTC_OFFSET_MINUTES * 60).unwrap_or_else(|| Utc.fix())
}

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Emitted as a JSON integer, never as a float.
    Integer(u64),
    /// Any other JSON number (negative or fractional), as the gateway sent it.
    Number(serde_json::Number),
    Text(String),
}

impl ParamValue {
    /// True for text that is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            ParamValue::Integer(_) | ParamValue::Number(_) => false,
            ParamValue::Text(s) => s.trim().is_empty(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Integer(n) => write!(f, "{}", n),
            ParamValue::Number(n) => write!(f, "{}", n),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Integer(u64::from(value))
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

/// Named parameters in the exact order the gateway signs them.
///
/// Serializes as a JSON object whose keys follow insertion order. The gateway
/// recomputes the signature over its own serialization of the body, so the
/// order here is part of the wire contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamList {
    entries: Vec<(String, ParamValue)>,
}

impl ParamList {
    /// Creates an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter, replacing the value in place if the name already exists.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder form of [`ParamList::push`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.push(name, value);
        self
    }

    /// Looks up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Parameter names in signing order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Name/value pairs in signing order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no parameters have been added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ParamList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Merchant identity, fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerchantConfig {
    pub merchant_code: u64,
    pub terminal_code: u64,
    /// Where the bank sends the user back after payment
    pub redirect_address: String,
    /// Payment type code (1003 = purchase)
    pub action: String,
    /// Offset used for `timeStamp` fields
    pub timezone: FixedOffset,
    pub refund_endpoint: RefundEndpoint,
}

impl MerchantConfig {
    pub fn new(merchant_code: u64, terminal_code: u64, redirect_address: impl Into<String>) -> Self {
        Self {
            merchant_code,
            terminal_code,
            redirect_address: redirect_address.into(),
            action: DEFAULT_ACTION.to_string(),
            timezone: gateway_offset(),
            refund_endpoint: RefundEndpoint::default(),
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn with_timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_refund_endpoint(mut self, refund_endpoint: RefundEndpoint) -> Self {
        self.refund_endpoint = refund_endpoint;
        self
    }
}

/// Invoice data. Every field must be present before a request is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceDetails {
    /// Amount in the smallest currency unit (rials)
    pub amount: Option<u64>,
    /// Merchant-unique invoice number
    pub invoice_number: Option<ParamValue>,
    /// Merchant-defined date string; must be identical on every call for the invoice
    pub invoice_date: Option<String>,
}

/// Token issued by GetToken, used only for the redirect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentToken(String);

impl PaymentToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference the bank assigns to a completed payment attempt (`tref`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionReferenceId(String);

impl TransactionReferenceId {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully prepared request, consumed by one transport call.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub operation: Operation,
    pub endpoint: &'static str,
    pub params: ParamList,
    pub canonical: Vec<u8>,
    /// Base64 signature; `None` for the unsigned status query
    pub signature: Option<String>,
}

/// Result of a call the gateway answered.
///
/// A rejection is a normal protocol outcome, not a client fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayOutcome<T> {
    Approved(T),
    Rejected { message: String },
}

impl<T> GatewayOutcome<T> {
    pub fn is_approved(&self) -> bool {
        matches!(self, GatewayOutcome::Approved(_))
    }

    pub fn approved(self) -> Option<T> {
        match self {
            GatewayOutcome::Approved(value) => Some(value),
            GatewayOutcome::Rejected { .. } => None,
        }
    }

    pub fn rejection_message(&self) -> Option<&str> {
        match self {
            GatewayOutcome::Approved(_) => None,
            GatewayOutcome::Rejected { message } => Some(message),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> GatewayOutcome<U> {
        match self {
            GatewayOutcome::Approved(value) => GatewayOutcome::Approved(f(value)),
            GatewayOutcome::Rejected { message } => GatewayOutcome::Rejected { message },
        }
    }

    /// Turns a rejection into `GatewayError::GatewayRejected`.
    pub fn into_result(self, operation: Operation) -> crate::error::GatewayResult<T> {
        match self {
            GatewayOutcome::Approved(value) => Ok(value),
            GatewayOutcome::Rejected { message } => {
                Err(crate::error::GatewayError::rejected(operation, message))
            }
        }
    }
}

// Gateway response envelope
#[derive(Debug, Deserialize)]
pub(crate) struct GatewayEnvelope<T> {
    #[serde(rename = "IsSuccess")]
    pub is_success: bool,
    #[serde(rename = "Message", default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

/// GetToken response body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(rename = "Token", default)]
    pub token: Option<String>,
}

/// VerifyPayment response body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    #[serde(rename = "MaskedCardNumber", default)]
    pub masked_card_number: Option<String>,
    #[serde(rename = "HashedCardNumber", default)]
    pub hashed_card_number: Option<String>,
    #[serde(rename = "ShaparakRefNumber", default)]
    pub shaparak_ref_number: Option<ParamValue>,
    #[serde(rename = "TransactionReferenceID", default)]
    pub transaction_reference_id: Option<ParamValue>,
}

/// CheckTransactionResult response body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckTransactionResponse {
    #[serde(rename = "TraceNumber", default)]
    pub trace_number: Option<ParamValue>,
    #[serde(rename = "ReferenceNumber", default)]
    pub reference_number: Option<ParamValue>,
    #[serde(rename = "TransactionDate", default)]
    pub transaction_date: Option<String>,
    #[serde(rename = "Action", default)]
    pub action: Option<ParamValue>,
    #[serde(rename = "TransactionReferenceID", default)]
    pub transaction_reference_id: Option<ParamValue>,
    #[serde(rename = "InvoiceNumber", default)]
    pub invoice_number: Option<ParamValue>,
    #[serde(rename = "InvoiceDate", default)]
    pub invoice_date: Option<String>,
    #[serde(rename = "MerchantCode", default)]
    pub merchant_code: Option<ParamValue>,
    #[serde(rename = "TerminalCode", default)]
    pub terminal_code: Option<ParamValue>,
    #[serde(rename = "Amount", default)]
    pub amount: Option<ParamValue>,
}

/// RefundPayment response body; the envelope carries everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundResponse {}
