// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

const GATEWAY_SANDBOX_URL: &str = "https://sandbox.payhere.lk/pay/checkout";
const GATEWAY_LIVE_URL: &str = "https://www.payhere.lk/pay/checkout";

/// Store-wide pricing and mail settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
  pub currency: String,
  pub shipping_fee_cents: i64,
  pub mail_sender: String,
}

/// Card network settings. `api_key == None` selects the simulated network.
#[derive(Debug, Clone)]
pub struct CardNetworkConfig {
  pub api_key: Option<String>,
  pub api_base: String,
  pub currency: String,
  pub minimum_amount_cents: i64,
  pub timeout: Duration,
}

/// Redirect gateway merchant credentials and callback URLs.
#[derive(Clone)]
pub struct GatewayConfig {
  pub merchant_id: String,
  pub merchant_secret: String,
  pub currency: String,
  pub sandbox: bool,
  pub return_url: String,
  pub cancel_url: String,
  pub notify_url: String,
}

impl GatewayConfig {
  pub fn checkout_url(&self) -> &'static str {
    if self.sandbox {
      GATEWAY_SANDBOX_URL
    } else {
      GATEWAY_LIVE_URL
    }
  }

  pub fn is_configured(&self) -> bool {
    !self.merchant_id.is_empty() && !self.merchant_secret.is_empty()
  }
}

// Keep the merchant secret out of logs.
impl std::fmt::Debug for GatewayConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("GatewayConfig")
      .field("merchant_id", &self.merchant_id)
      .field("merchant_secret", &"[REDACTED]")
      .field("currency", &self.currency)
      .field("sandbox", &self.sandbox)
      .field("return_url", &self.return_url)
      .field("cancel_url", &self.cancel_url)
      .field("notify_url", &self.notify_url)
      .finish()
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// `None` runs on the in-memory store.
  pub database_url: Option<String>,
  pub store: StoreConfig,
  pub card: CardNetworkConfig,
  pub gateway: GatewayConfig,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    let config = Self::from_vars(|name| env::var(name).ok())?;
    tracing::info!("Application configuration loaded successfully.");
    Ok(config)
  }

  /// Builds the configuration from any variable source. Missing values fall
  /// back to development defaults; malformed numbers are errors.
  pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_or = |name: &str, default: &str| lookup(name).filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string());
    let parse_num = |name: &str, default: &str| -> Result<i64> {
      get_or(name, default)
        .parse::<i64>()
        .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e)))
    };

    let server_host = get_or("SERVER_HOST", "127.0.0.1");
    let server_port = get_or("SERVER_PORT", "8080")
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = lookup("DATABASE_URL").filter(|v| !v.is_empty());
    let production = get_or("APP_ENV", "development") == "production";
    let currency = get_or("STORE_CURRENCY", "LKR");

    let shipping_fee_cents = parse_num("SHIPPING_FEE_CENTS", "1000")?;
    let minimum_amount_cents = parse_num("CARD_MIN_AMOUNT_CENTS", "20000")?;
    let timeout_ms = parse_num("PROVIDER_TIMEOUT_MS", "10000")?;
    if shipping_fee_cents < 0 || minimum_amount_cents < 0 || timeout_ms <= 0 {
      return Err(AppError::Config(
        "SHIPPING_FEE_CENTS and CARD_MIN_AMOUNT_CENTS must be non-negative, PROVIDER_TIMEOUT_MS positive".to_string(),
      ));
    }

    let gateway = GatewayConfig {
      merchant_id: get_or("GATEWAY_MERCHANT_ID", ""),
      merchant_secret: get_or("GATEWAY_MERCHANT_SECRET", ""),
      currency: currency.clone(),
      sandbox: !production,
      return_url: get_or("GATEWAY_RETURN_URL", "http://localhost:5173/payment/success"),
      cancel_url: get_or("GATEWAY_CANCEL_URL", "http://localhost:5173/payment/cancel"),
      notify_url: get_or(
        "GATEWAY_NOTIFY_URL",
        &format!("http://{}:{}/api/v1/payments/gateway/notify", server_host, server_port),
      ),
    };
    if !gateway.is_configured() {
      tracing::warn!("Redirect gateway credentials missing; gateway payments are disabled.");
    }

    Ok(Self {
      server_host,
      server_port,
      database_url,
      store: StoreConfig {
        currency: currency.clone(),
        shipping_fee_cents,
        mail_sender: get_or("MAIL_SENDER", "noreply@example.com"),
      },
      card: CardNetworkConfig {
        api_key: lookup("CARD_API_KEY").filter(|v| !v.is_empty()),
        api_base: get_or("CARD_API_BASE", "https://api.stripe.com"),
        currency: currency.to_lowercase(),
        minimum_amount_cents,
        timeout: Duration::from_millis(timeout_ms as u64),
      },
      gateway,
    })
  }
}
