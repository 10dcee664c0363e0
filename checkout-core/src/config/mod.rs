use anyhow::{bail, Result};
use dotenvy::dotenv;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Which gateway environment a public key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEnvironment {
    Test,
    Live,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub api: ApiSettings,
    pub gateway: GatewaySettings,
    pub reconciliation: ReconciliationSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApiSettings {
    pub base_url: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct GatewaySettings {
    pub public_key: String,
    pub currency: String,
    pub channels: Vec<String>,
    pub readiness_max_attempts: u32,
    pub readiness_interval_ms: u64,
}

impl GatewaySettings {
    pub fn readiness_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_interval_ms)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct ReconciliationSettings {
    pub poll_max_attempts: u32,
    pub poll_interval_ms: u64,
    /// Minimum suggested completion amount, in major units.
    pub completion_floor: Decimal,
}

impl ReconciliationSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Validate the gateway public key format without calling the gateway.
/// Publishable keys are prefixed `pk_test_` or `pk_live_`.
pub fn validate_public_key(key: &str) -> Result<KeyEnvironment> {
    if key.is_empty() {
        bail!("Gateway public key is not set");
    }
    let environment = if key.starts_with("pk_test_") {
        KeyEnvironment::Test
    } else if key.starts_with("pk_live_") {
        KeyEnvironment::Live
    } else {
        bail!("Gateway public key must start with pk_test_ or pk_live_");
    };
    if key.len() < 20 {
        bail!("Gateway public key looks truncated");
    }
    Ok(environment)
}

fn default_channels() -> Vec<String> {
    ["card", "bank", "ussd", "qr", "mobile_money"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let base_url = env::var("CHECKOUT_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let public_key = env::var("CHECKOUT_GATEWAY_PUBLIC_KEY").unwrap_or_default();
        let environment = validate_public_key(&public_key)?;
        if environment == KeyEnvironment::Test {
            tracing::warn!("Gateway public key is a test key; charges will not be real");
        }

        let currency = env::var("CHECKOUT_CURRENCY").unwrap_or_else(|_| "NGN".to_string());
        let channels = env::var("CHECKOUT_CHANNELS")
            .map(|raw| {
                raw.split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| default_channels());

        let readiness_max_attempts = env::var("CHECKOUT_READINESS_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()?;
        let readiness_interval_ms = env::var("CHECKOUT_READINESS_INTERVAL_MS")
            .unwrap_or_else(|_| "500".to_string())
            .parse()?;

        let poll_max_attempts = env::var("CHECKOUT_RECON_POLL_ATTEMPTS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;
        let poll_interval_ms = env::var("CHECKOUT_RECON_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()?;
        let completion_floor = env::var("CHECKOUT_COMPLETION_FLOOR")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()?;

        Ok(Self {
            api: ApiSettings { base_url },
            gateway: GatewaySettings {
                public_key,
                currency,
                channels,
                readiness_max_attempts,
                readiness_interval_ms,
            },
            reconciliation: ReconciliationSettings {
                poll_max_attempts,
                poll_interval_ms,
                completion_floor,
            },
        })
    }
}
