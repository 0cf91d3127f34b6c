use thiserror::Error;

use crate::payments::endpoints::Operation;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{operation}: required field `{field}` is missing")]
    IncompleteRequest {
        operation: Operation,
        field: &'static str,
    },

    #[error("Failed to encode request parameters: {message}")]
    EncodingError { message: String },

    #[error("Signing error: {message}")]
    SigningError { message: String },

    #[error("Failed to load key from {path}: {message}")]
    KeyLoadError { path: String, message: String },

    #[error("{operation}: transport error: {message}")]
    TransportError {
        operation: Operation,
        message: String,
        is_timeout: bool,
    },

    #[error("{operation}: malformed gateway response: {message}")]
    MalformedResponse { operation: Operation, message: String },

    #[error("{operation}: no transaction reference ID is known for this session")]
    MissingTransactionReference { operation: Operation },

    #[error("{operation}: rejected by gateway: {message}")]
    GatewayRejected { operation: Operation, message: String },

    #[error("Invoice field `{field}` cannot change after a request was sent")]
    InvoiceLocked { field: &'static str },

    #[error("Invalid invoice field `{field}`: {message}")]
    InvalidInvoice {
        field: &'static str,
        message: String,
    },

    #[error("Malformed bank callback: {message}")]
    MalformedCallback { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

impl GatewayError {
    pub fn incomplete(operation: Operation, field: &'static str) -> Self {
        Self::IncompleteRequest { operation, field }
    }

    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    pub fn signing_error(message: impl Into<String>) -> Self {
        Self::SigningError {
            message: message.into(),
        }
    }

    pub fn key_load_error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::KeyLoadError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn transport_error(operation: Operation, message: impl Into<String>) -> Self {
        Self::TransportError {
            operation,
            message: message.into(),
            is_timeout: false,
        }
    }

    pub fn timeout_error(operation: Operation, message: impl Into<String>) -> Self {
        Self::TransportError {
            operation,
            message: message.into(),
            is_timeout: true,
        }
    }

    pub fn malformed_response(operation: Operation, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            operation,
            message: message.into(),
        }
    }

    pub fn rejected(operation: Operation, message: impl Into<String>) -> Self {
        Self::GatewayRejected {
            operation,
            message: message.into(),
        }
    }

    pub fn invalid_invoice(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInvoice {
            field,
            message: message.into(),
        }
    }

    pub fn malformed_callback(message: impl Into<String>) -> Self {
        Self::MalformedCallback {
            message: message.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// The operation the error was raised for, when it came from a gateway call.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::IncompleteRequest { operation, .. }
            | Self::TransportError { operation, .. }
            | Self::MalformedResponse { operation, .. }
            | Self::MissingTransactionReference { operation }
            | Self::GatewayRejected { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// Whether a caller may safely resend the same request.
    ///
    /// Only transport failures on the unsigned status query qualify; resending a
    /// signed request can move money twice.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransportError {
                operation: Operation::CheckTransaction,
                ..
            }
        )
    }
}

impl From<rsa::Error> for GatewayError {
    fn from(err: rsa::Error) -> Self {
        GatewayError::signing_error(format!("RSA error: {}", err))
    }
}

impl From<config::ConfigError> for GatewayError {
    fn from(err: config::ConfigError) -> Self {
        GatewayError::config_error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_check_transport_errors_are_retryable() {
        let check = GatewayError::transport_error(Operation::CheckTransaction, "reset");
        let refund = GatewayError::transport_error(Operation::RefundPayment, "reset");
        let rejected = GatewayError::rejected(Operation::CheckTransaction, "nope");

        assert!(check.is_retryable());
        assert!(!refund.is_retryable());
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn test_error_messages_name_the_operation() {
        let err = GatewayError::incomplete(Operation::GetToken, "amount");
        assert_eq!(
            err.to_string(),
            "GetToken: required field `amount` is missing"
        );
        assert_eq!(err.operation(), Some(Operation::GetToken));
        assert_eq!(GatewayError::signing_error("x").operation(), None);
    }

    #[test]
    fn test_encoding_failure_is_not_a_signing_error() {
        let err = GatewayError::encoding_error("key must be a string");
        assert!(matches!(err, GatewayError::EncodingError { .. }));
        assert_eq!(
            err.to_string(),
            "Failed to encode request parameters: key must be a string"
        );
    }

    #[test]
    fn test_rsa_error_converts_to_signing_error() {
        let err: GatewayError = rsa::Error::Verification.into();
        assert!(matches!(err, GatewayError::SigningError { ref message } if message.starts_with("RSA error")));
    }
}
