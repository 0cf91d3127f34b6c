//! Parsing of the bank's return redirect
//!
//! After payment the gateway sends the user back to `redirectAddress` with the
//! invoice number (`iN`), invoice date (`iD`) and transaction reference (`tref`)
//! in the query string.

use url::Url;

use crate::error::{GatewayError, GatewayResult};
use crate::payments::types::TransactionReferenceId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankCallback {
    pub invoice_number: Option<String>,
    pub invoice_date: Option<String>,
    pub transaction_reference_id: TransactionReferenceId,
}

impl BankCallback {
    /// Parses a raw query string, with or without the leading `?`.
    pub fn from_query(query: &str) -> GatewayResult<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
    }

    /// Parses the full callback URL the user landed on.
    pub fn from_url(callback_url: &str) -> GatewayResult<Self> {
        let parsed = Url::parse(callback_url)
            .map_err(|e| GatewayError::malformed_callback(format!("invalid URL: {}", e)))?;
        Self::from_pairs(parsed.query_pairs())
    }

    fn from_pairs<'a, I>(pairs: I) -> GatewayResult<Self>
    where
        I: Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
    {
        let mut invoice_number = None;
        let mut invoice_date = None;
        let mut tref = None;

        for (key, value) in pairs {
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "iN" => invoice_number = Some(value),
                "iD" => invoice_date = Some(value),
                "tref" => tref = Some(value),
                _ => {}
            }
        }

        let tref = tref.ok_or_else(|| GatewayError::malformed_callback("missing `tref` parameter"))?;

        Ok(Self {
            invoice_number,
            invoice_date,
            transaction_reference_id: TransactionReferenceId::new(tref),
        })
    }
}
