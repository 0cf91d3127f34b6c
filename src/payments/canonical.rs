//! Canonical byte form of a parameter list
//!
//! The bytes produced here are both what gets signed and what goes on the wire as
//! the request body. They must be a pure function of the ordered input.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;

use crate::error::{GatewayError, GatewayResult};
use crate::payments::endpoints::Operation;
use crate::payments::types::{InvoiceDetails, ParamList, ParamValue};

/// Layout of every `timeStamp` and the conventional `invoiceDate` layout.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Compact JSON formatter using the gateway's string escaping.
///
/// On top of the usual JSON escapes, `/` is written as `\/` and every non-ASCII
/// character as lowercase `\uXXXX` UTF-16 code units. The bank re-serializes the
/// body this way before checking the signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct GatewayJsonFormatter;

impl Formatter for GatewayJsonFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let bytes = fragment.as_bytes();
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            if ch != '/' && ch.is_ascii() {
                continue;
            }
            if start < index {
                writer.write_all(&bytes[start..index])?;
            }
            if ch == '/' {
                writer.write_all(b"\\/")?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
            start = index + ch.len_utf8();
        }
        if start < bytes.len() {
            writer.write_all(&bytes[start..])?;
        }
        Ok(())
    }
}

/// Serializes the parameters as compact JSON in insertion order.
pub fn canonicalize(params: &ParamList) -> GatewayResult<Vec<u8>> {
    let mut out = Vec::with_capacity(128);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, GatewayJsonFormatter);
    params
        .serialize(&mut serializer)
        .map_err(|e| GatewayError::encoding_error(e.to_string()))?;
    Ok(out)
}

/// Formats an instant as `YYYY/MM/DD HH:MM:SS` in the given offset.
pub fn format_timestamp(instant: DateTime<Utc>, timezone: FixedOffset) -> String {
    instant
        .with_timezone(&timezone)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

pub(crate) fn require_amount(operation: Operation, invoice: &InvoiceDetails) -> GatewayResult<u64> {
    match invoice.amount {
        Some(amount) if amount > 0 => Ok(amount),
        _ => Err(GatewayError::incomplete(operation, "amount")),
    }
}

pub(crate) fn require_invoice_number(
    operation: Operation,
    invoice: &InvoiceDetails,
) -> GatewayResult<ParamValue> {
    match &invoice.invoice_number {
        Some(number) if !number.is_blank() => Ok(number.clone()),
        _ => Err(GatewayError::incomplete(operation, "invoiceNumber")),
    }
}

pub(crate) fn require_invoice_date(
    operation: Operation,
    invoice: &InvoiceDetails,
) -> GatewayResult<String> {
    match &invoice.invoice_date {
        Some(date) if !date.trim().is_empty() => Ok(date.clone()),
        _ => Err(GatewayError::incomplete(operation, "invoiceDate")),
    }
}

pub(crate) fn require_code(
    operation: Operation,
    field: &'static str,
    code: u64,
) -> GatewayResult<u64> {
    if code == 0 {
        return Err(GatewayError::incomplete(operation, field));
    }
    Ok(code)
}

pub(crate) fn require_text(
    operation: Operation,
    field: &'static str,
    value: &str,
) -> GatewayResult<String> {
    if value.trim().is_empty() {
        return Err(GatewayError::incomplete(operation, field));
    }
    Ok(value.to_string())
}
