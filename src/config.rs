use chrono::FixedOffset;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GatewayError, GatewayResult};
use crate::payments::endpoints::{RefundEndpoint, DEFAULT_ACTION};
use crate::payments::transport::HttpTransportConfig;
use crate::payments::types::{MerchantConfig, GATEWAY_UTC_OFFSET_MINUTES};

/// Merchant credentials and client settings.
///
/// Read from an optional file, then overridden by `PASARGAD_*` environment
/// variables (`PASARGAD_MERCHANT_CODE`, `PASARGAD_KEY_PATH`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    pub merchant_code: u64,
    pub terminal_code: u64,
    pub redirect_address: String,
    /// Merchant private key (XML or PEM)
    pub key_path: PathBuf,
    #[serde(default = "default_action")]
    pub action: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub dedicated_refund_endpoint: bool,
}

fn default_action() -> String {
    DEFAULT_ACTION.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_utc_offset_minutes() -> i32 {
    GATEWAY_UTC_OFFSET_MINUTES
}

impl GatewaySettings {
    pub fn load(file: Option<&Path>) -> GatewayResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(Environment::with_prefix("PASARGAD").try_parsing(true));
        Self::from_builder(builder)
    }

    pub fn from_env() -> GatewayResult<Self> {
        Self::load(None)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> GatewayResult<Self> {
        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> GatewayResult<()> {
        if self.merchant_code == 0 {
            return Err(GatewayError::config_error("merchant_code must be greater than 0"));
        }

        if self.terminal_code == 0 {
            return Err(GatewayError::config_error("terminal_code must be greater than 0"));
        }

        if self.redirect_address.trim().is_empty() {
            return Err(GatewayError::config_error("redirect_address cannot be empty"));
        }

        if !self.redirect_address.starts_with("http://") && !self.redirect_address.starts_with("https://") {
            return Err(GatewayError::config_error(format!(
                "redirect_address must be an http(s) URL, got {}",
                self.redirect_address
            )));
        }

        if self.key_path.as_os_str().is_empty() {
            return Err(GatewayError::config_error("key_path cannot be empty"));
        }

        if self.action.trim().is_empty() {
            return Err(GatewayError::config_error("action cannot be empty"));
        }

        if self.timeout_secs == 0 {
            return Err(GatewayError::config_error("timeout_secs must be greater than 0"));
        }

        if self.utc_offset_minutes.abs() > 14 * 60 {
            return Err(GatewayError::config_error(format!(
                "utc_offset_minutes must be within +/-840, got {}",
                self.utc_offset_minutes
            )));
        }

        Ok(())
    }

    pub fn merchant_config(&self) -> GatewayResult<MerchantConfig> {
        let timezone = FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            GatewayError::config_error(format!(
                "invalid utc_offset_minutes {}",
                self.utc_offset_minutes
            ))
        })?;

        let refund_endpoint = if self.dedicated_refund_endpoint {
            RefundEndpoint::Dedicated
        } else {
            RefundEndpoint::VerifyPayment
        };

        Ok(
            MerchantConfig::new(self.merchant_code, self.terminal_code, self.redirect_address.clone())
                .with_action(self.action.clone())
                .with_timezone(timezone)
                .with_refund_endpoint(refund_endpoint),
        )
    }

    pub fn transport_config(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            ..Default::default()
        }
    }
}
