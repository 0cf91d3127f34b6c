//! Pasargad gateway integration
//!
//! Canonicalization and signing of gateway requests, the payment lifecycle, and
//! the collaborators (transport, key loading) the protocol engine calls through.

pub mod callback;
pub mod canonical;
pub mod endpoints;
pub mod keys;
pub mod lifecycle;
pub mod requests;
pub mod session;
pub mod signer;
pub mod traits;
pub mod transport;
pub mod types;

pub use callback::BankCallback;
pub use endpoints::{Operation, RefundEndpoint};
pub use keys::FileKeyLoader;
pub use lifecycle::{FollowUp, LifecycleState};
pub use session::PaymentSession;
pub use signer::Signer;
pub use traits::{Clock, GatewayTransport, KeyLoader, SystemClock, TransportRequest};
pub use transport::{HttpTransport, HttpTransportConfig};
pub use types::{GatewayOutcome, MerchantConfig, ParamList, ParamValue, PaymentToken, TransactionReferenceId};
