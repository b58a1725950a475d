//! Environment-driven configuration.

use chrono::Duration;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::aggregates::ReferralPolicy;
use crate::domain::value_objects::Money;

const MIDTRANS_SANDBOX_URL: &str = "https://app.sandbox.midtrans.com";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub nats_url: Option<String>,
    pub midtrans_server_key: Option<String>,
    pub midtrans_base_url: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub payment_window_minutes: i64,
    pub auto_confirm_days: i64,
    pub sweep_interval_secs: u64,
    pub referral_threshold: u32,
    pub referral_reward_amount: Decimal,
    pub referral_reward_validity_days: i64,
    pub shipping_base_fee: Decimal,
    pub shipping_fee_per_km: Decimal,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| lookup(key).filter(|v| !v.is_empty()).ok_or(ConfigError::Missing(key));
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            port: parse(&lookup, "PORT", 8083)?,
            jwt_ttl_hours: parse(&lookup, "JWT_TTL_HOURS", 24)?,
            nats_url: lookup("NATS_URL").filter(|v| !v.is_empty()),
            midtrans_server_key: lookup("MIDTRANS_SERVER_KEY").filter(|v| !v.is_empty()),
            midtrans_base_url: lookup("MIDTRANS_BASE_URL").unwrap_or_else(|| MIDTRANS_SANDBOX_URL.to_string()),
            upload_dir: lookup("UPLOAD_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("uploads")),
            max_upload_bytes: parse(&lookup, "MAX_UPLOAD_BYTES", 1024 * 1024)?,
            payment_window_minutes: parse(&lookup, "PAYMENT_WINDOW_MINUTES", 60)?,
            auto_confirm_days: parse(&lookup, "AUTO_CONFIRM_DAYS", 7)?,
            sweep_interval_secs: parse(&lookup, "SWEEP_INTERVAL_SECS", 60)?,
            referral_threshold: parse(&lookup, "REFERRAL_THRESHOLD", 3)?,
            referral_reward_amount: parse(&lookup, "REFERRAL_REWARD_AMOUNT", Decimal::from(20_000))?,
            referral_reward_validity_days: parse(&lookup, "REFERRAL_REWARD_VALIDITY_DAYS", 30)?,
            shipping_base_fee: parse(&lookup, "SHIPPING_BASE_FEE", Decimal::from(10_000))?,
            shipping_fee_per_km: parse(&lookup, "SHIPPING_FEE_PER_KM", Decimal::from(2_000))?,
        })
    }

    pub fn payment_window(&self) -> Duration { Duration::minutes(self.payment_window_minutes) }

    pub fn auto_confirm_after(&self) -> Duration { Duration::days(self.auto_confirm_days) }

    pub fn referral_policy(&self) -> ReferralPolicy {
        ReferralPolicy {
            threshold: self.referral_threshold,
            reward_amount: Money::new(self.referral_reward_amount),
            reward_validity: Duration::days(self.referral_reward_validity_days),
        }
    }

    /// Flat fee plus a per-started-kilometre fee.
    pub fn shipping_cost(&self, distance_km: f64) -> Money {
        let km = Decimal::from(distance_km.max(0.0).ceil() as i64);
        Money::new(self.shipping_base_fee + self.shipping_fee_per_km * km)
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) if !value.is_empty() => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
        _ => Ok(default),
    }
}
