//! Client for the Pasargad bank payment gateway's signed HTTP API.
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use pasargad_gateway::payments::{
//!     FileKeyLoader, HttpTransport, HttpTransportConfig, MerchantConfig, PaymentSession,
//! };
//!
//! # async fn run() -> pasargad_gateway::error::GatewayResult<()> {
//! let signer = FileKeyLoader::new().load_signer(Path::new("merchant.xml"))?;
//! let transport = Arc::new(HttpTransport::new(HttpTransportConfig::default())?);
//! let merchant = MerchantConfig::new(123, 456, "https://shop.example/back");
//!
//! let session = PaymentSession::new(merchant, signer, transport);
//! session.set_amount(50_000).await?;
//! session.set_invoice_number("INV-1").await?;
//! session.set_invoice_date("2024/01/01 10:00:00").await?;
//! let url = session.redirect().await?;
//! # let _ = url;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod payments;

pub use error::{GatewayError, GatewayResult};
