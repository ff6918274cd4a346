#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::utils::error::{Result, TelemetryError};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "https://smartaid-6c5c0-default-rtdb.firebaseio.com";
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com";
pub const DEFAULT_CREDENTIALS_ENV: &str = "FIREBASE_CREDENTIALS";
pub const AUTH_TOKEN_ENV: &str = "FIREBASE_AUTH_TOKEN";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8050";

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}
fn default_firestore_url() -> String {
    DEFAULT_FIRESTORE_URL.to_string()
}
fn default_credentials_env() -> String {
    DEFAULT_CREDENTIALS_ENV.to_string()
}
fn default_fetch_page_size() -> u32 {
    300
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_retry_attempts() -> u32 {
    2
}
fn default_retry_delay_ms() -> u64 {
    500
}
fn default_refresh_interval_secs() -> u64 {
    10
}
fn default_temperature_alert() -> f64 {
    80.0
}
fn default_battery_alert() -> f64 {
    20.0
}
fn default_detection_bucket_secs() -> u64 {
    60
}
fn default_confidence_bins() -> usize {
    10
}
fn default_map_zoom() -> u8 {
    15
}
fn default_table_page_size() -> usize {
    5
}
fn default_output_path() -> String {
    "./dashboard".to_string()
}
fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

/// Where and how to reach Firebase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct SourceSettings {
    #[serde(default = "default_database_url")]
    #[cfg_attr(feature = "cli", arg(long, default_value = DEFAULT_DATABASE_URL))]
    pub database_url: String,

    /// Falls back to the project_id in the service account credentials.
    #[serde(default)]
    #[cfg_attr(feature = "cli", arg(long))]
    pub project_id: Option<String>,

    #[serde(default = "default_firestore_url")]
    #[cfg_attr(feature = "cli", arg(long, default_value = DEFAULT_FIRESTORE_URL))]
    pub firestore_base_url: String,

    #[serde(default = "default_credentials_env")]
    #[cfg_attr(feature = "cli", arg(long, default_value = DEFAULT_CREDENTIALS_ENV))]
    pub credentials_env: String,

    /// Falls back to FIREBASE_AUTH_TOKEN.
    #[serde(default)]
    #[cfg_attr(feature = "cli", arg(long))]
    pub auth_token: Option<String>,

    #[serde(default = "default_fetch_page_size")]
    #[cfg_attr(feature = "cli", arg(long, default_value_t = default_fetch_page_size()))]
    pub fetch_page_size: u32,

    #[serde(default = "default_timeout_secs")]
    #[cfg_attr(feature = "cli", arg(long, default_value_t = default_timeout_secs()))]
    pub timeout_secs: u64,

    #[serde(default = "default_retry_attempts")]
    #[cfg_attr(feature = "cli", arg(long, default_value_t = default_retry_attempts()))]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    #[cfg_attr(feature = "cli", arg(long, default_value_t = default_retry_delay_ms()))]
    pub retry_delay_ms: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            project_id: None,
            firestore_base_url: default_firestore_url(),
            credentials_env: default_credentials_env(),
            auth_token: None,
            fetch_page_size: default_fetch_page_size(),
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl SourceSettings {
    /// Explicit token first, then the environment.
    pub fn resolved_auth_token(&self) -> Option<String> {
        self.auth_token
            .clone()
            .or_else(|| std::env::var(AUTH_TOKEN_ENV).ok())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Validate for SourceSettings {
    fn validate(&self) -> Result<()> {
        validate_url("source.database_url", &self.database_url)?;
        validate_url("source.firestore_base_url", &self.firestore_base_url)?;
        validate_non_empty_string("source.credentials_env", &self.credentials_env)?;
        if let Some(project_id) = &self.project_id {
            validate_non_empty_string("source.project_id", project_id)?;
        }
        validate_positive_number("source.fetch_page_size", self.fetch_page_size as u64, 1)?;
        validate_positive_number("source.timeout_secs", self.timeout_secs, 1)?;
        Ok(())
    }
}

/// How the view is built and how often it is refreshed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct DashboardSettings {
    #[serde(default = "default_refresh_interval_secs")]
    #[cfg_attr(feature = "cli", arg(long, default_value_t = default_refresh_interval_secs()))]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_temperature_alert")]
    #[cfg_attr(feature = "cli", arg(long, default_value_t = default_temperature_alert()))]
    pub temperature_alert_celsius: f64,

    #[serde(default = "default_battery_alert")]
    #[cfg_attr(feature = "cli", arg(long, default_value_t = default_battery_alert()))]
    pub battery_alert_percent: f64,

    #[serde(default = "default_detection_bucket_secs")]
    #[cfg_attr(feature = "cli", arg(long, default_value_t = default_detection_bucket_secs()))]
    pub detection_bucket_secs: u64,

    #[serde(default = "default_confidence_bins")]
    #[cfg_attr(feature = "cli", arg(long, default_value_t = default_confidence_bins()))]
    pub confidence_bins: usize,

    #[serde(default = "default_map_zoom")]
    #[cfg_attr(feature = "cli", arg(long, default_value_t = default_map_zoom()))]
    pub map_zoom: u8,

    #[serde(default = "default_table_page_size")]
    #[cfg_attr(feature = "cli", arg(long, default_value_t = default_table_page_size()))]
    pub table_page_size: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            temperature_alert_celsius: default_temperature_alert(),
            battery_alert_percent: default_battery_alert(),
            detection_bucket_secs: default_detection_bucket_secs(),
            confidence_bins: default_confidence_bins(),
            map_zoom: default_map_zoom(),
            table_page_size: default_table_page_size(),
        }
    }
}

impl DashboardSettings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Validate for DashboardSettings {
    fn validate(&self) -> Result<()> {
        validate_positive_number(
            "dashboard.refresh_interval_secs",
            self.refresh_interval_secs,
            1,
        )?;
        validate_positive_number(
            "dashboard.detection_bucket_secs",
            self.detection_bucket_secs,
            1,
        )?;
        validate_positive_number("dashboard.confidence_bins", self.confidence_bins as u64, 1)?;
        validate_positive_number("dashboard.table_page_size", self.table_page_size as u64, 1)?;
        validate_range(
            "dashboard.battery_alert_percent",
            self.battery_alert_percent,
            0.0,
            100.0,
        )?;
        validate_range(
            "dashboard.temperature_alert_celsius",
            self.temperature_alert_celsius,
            -50.0,
            150.0,
        )?;
        validate_range("dashboard.map_zoom", self.map_zoom, 0, 22)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadSettings {
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default)]
    pub export_archive: bool,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            export_archive: false,
        }
    }
}

impl Validate for LoadSettings {
    fn validate(&self) -> Result<()> {
        validate_path("load.output_path", &self.output_path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub json_logs: bool,
}

/// HTTP endpoint serving the latest view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: default_bind_address(),
        }
    }
}

impl ServerSettings {
    /// The address to serve on, or `None` when serving is disabled.
    pub fn serve_address(&self) -> Result<Option<SocketAddr>> {
        if !self.enabled {
            return Ok(None);
        }
        self.bind_address
            .parse()
            .map(Some)
            .map_err(|e: std::net::AddrParseError| TelemetryError::InvalidConfigValue {
                field: "server.bind_address".to_string(),
                value: self.bind_address.clone(),
                reason: e.to_string(),
            })
    }
}

impl Validate for ServerSettings {
    fn validate(&self) -> Result<()> {
        self.serve_address().map(|_| ())
    }
}
