use crate::domain::fees::ReportPolicy;
use crate::error::{BookingError, Result};
use serde::Deserialize;
use std::path::Path;

/// Connection settings for the mobile-money collection API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    pub base_url: String,
    #[serde(default)]
    pub subscription_key: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_target_environment")]
    pub target_environment: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_target_environment() -> String {
    "sandbox".to_string()
}

fn default_currency() -> String {
    "XAF".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfig {
    /// Payment window for pay-at-agency bookings. Capped at the trip's
    /// departure when computing the deadline.
    #[serde(default = "default_agency_deadline_hours")]
    pub agency_deadline_hours: i64,
    /// Short confirmation window for mobile-money bookings.
    #[serde(default = "default_momo_confirm_minutes")]
    pub momo_confirm_minutes: i64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_agency_deadline_hours() -> i64 {
    24
}

fn default_momo_confirm_minutes() -> i64 {
    15
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            agency_deadline_hours: default_agency_deadline_hours(),
            momo_confirm_minutes: default_momo_confirm_minutes(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    pub report_policy: ReportPolicy,
}

impl Settings {
    /// Loads settings from a JSON file. Gateway secrets may be supplied or
    /// overridden through `MOMO_SUBSCRIPTION_KEY`, `MOMO_USER_ID` and
    /// `MOMO_API_KEY` so they stay out of the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut settings: Settings = serde_json::from_str(&raw)
            .map_err(|e| BookingError::Config(format!("invalid settings file: {e}")))?;

        if let Ok(v) = std::env::var("MOMO_SUBSCRIPTION_KEY") {
            settings.gateway.subscription_key = v;
        }
        if let Ok(v) = std::env::var("MOMO_USER_ID") {
            settings.gateway.user_id = v;
        }
        if let Ok(v) = std::env::var("MOMO_API_KEY") {
            settings.gateway.api_key = v;
        }

        if settings.gateway.subscription_key.is_empty()
            || settings.gateway.user_id.is_empty()
            || settings.gateway.api_key.is_empty()
        {
            return Err(BookingError::Config(
                "gateway credentials missing (file or MOMO_* env vars)".to_string(),
            ));
        }

        Ok(settings)
    }
}
