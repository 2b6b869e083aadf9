//! # Corrector Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CORRECTOR_DEVICE_ADDRESS=192.168.1.50                              │
//! │     CORRECTOR_OFD_TOKEN=...                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config PATH, or                                                  │
//! │     ~/.config/corrector/corrector.toml (Linux)                        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     USB register, ofd.ru, Planfix account "ats"                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [device]
//! name = "Register 1"
//! medium = "network"
//! address = "192.168.1.50"
//! port = 5555
//! busy_backoff_ms = 1000
//! max_busy_retries = 3
//!
//! [feed]
//! base_url = "https://ofd.ru"
//! vatin = "7700000000"
//! registration_id = "0000000000012345"
//! token = "..."
//!
//! [report]
//! enabled = true
//! account = "ats"
//! method = "correction-receipt"
//! task_id = "1024"
//! ```

use corrector_device::{ConnectionMedium, DeviceSettings, FiscalConnection};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Device Section
// =============================================================================

/// Which register to drive and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSection {
    /// Display name, sent in reports.
    #[serde(default = "default_device_name")]
    pub name: String,

    #[serde(default)]
    pub medium: ConnectionMedium,

    /// COM file, USB path, IP address or MAC address.
    #[serde(default)]
    pub address: String,

    /// Network only.
    #[serde(default)]
    pub port: Option<u16>,

    /// Wait after "previous operation not complete" (milliseconds).
    #[serde(default = "default_busy_backoff_ms")]
    pub busy_backoff_ms: u64,

    /// How many times a receipt is replayed again after a busy device.
    #[serde(default = "default_max_busy_retries")]
    pub max_busy_retries: u32,

    #[serde(default)]
    pub provision_uses_cash_sum: bool,
}

fn default_device_name() -> String {
    "Касса".to_string()
}

fn default_busy_backoff_ms() -> u64 {
    1000
}

fn default_max_busy_retries() -> u32 {
    3
}

impl Default for DeviceSection {
    fn default() -> Self {
        DeviceSection {
            name: default_device_name(),
            medium: ConnectionMedium::default(),
            address: String::new(),
            port: None,
            busy_backoff_ms: default_busy_backoff_ms(),
            max_busy_retries: default_max_busy_retries(),
            provision_uses_cash_sum: false,
        }
    }
}

impl DeviceSection {
    pub fn connection(&self) -> FiscalConnection {
        FiscalConnection {
            medium: self.medium,
            address: self.address.clone(),
            port: self.port,
        }
    }

    pub fn settings(&self) -> DeviceSettings {
        DeviceSettings {
            busy_backoff: Duration::from_millis(self.busy_backoff_ms),
            provision_uses_cash_sum: self.provision_uses_cash_sum,
        }
    }
}

// =============================================================================
// Feed Section
// =============================================================================

/// OFD.ru integration credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    #[serde(default = "default_feed_url")]
    pub base_url: String,

    /// Taxpayer number (INN) of the register owner.
    #[serde(default)]
    pub vatin: String,

    /// Registration number of the register.
    #[serde(default)]
    pub registration_id: String,

    /// Integration API token.
    #[serde(default)]
    pub token: String,

    /// First retry delay (milliseconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Give up retrying after this long (seconds).
    #[serde(default = "default_max_elapsed")]
    pub max_elapsed_secs: u64,
}

fn default_feed_url() -> String {
    "https://ofd.ru".to_string()
}

fn default_initial_backoff() -> u64 {
    500
}

fn default_max_elapsed() -> u64 {
    60
}

impl Default for FeedSettings {
    fn default() -> Self {
        FeedSettings {
            base_url: default_feed_url(),
            vatin: String::new(),
            registration_id: String::new(),
            token: String::new(),
            initial_backoff_ms: default_initial_backoff(),
            max_elapsed_secs: default_max_elapsed(),
        }
    }
}

impl FeedSettings {
    /// Returns true once credentials are present.
    pub fn is_configured(&self) -> bool {
        !self.vatin.is_empty() && !self.registration_id.is_empty() && !self.token.is_empty()
    }
}

// =============================================================================
// Report Section
// =============================================================================

/// Planfix webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Planfix account, the subdomain of planfix.ru.
    #[serde(default = "default_account")]
    pub account: String,

    /// Webhook method name.
    #[serde(default = "default_method")]
    pub method: String,

    /// Task that collects the reports.
    #[serde(default = "default_task_id")]
    pub task_id: String,

    /// Body template; `%task%`, `%success%`, `%total%`, `%name%` are substituted.
    #[serde(default = "default_template")]
    pub template: String,
}

fn default_true() -> bool {
    true
}

fn default_account() -> String {
    "ats".to_string()
}

fn default_method() -> String {
    "correction-receipt".to_string()
}

fn default_task_id() -> String {
    "0".to_string()
}

fn default_template() -> String {
    r#"{"task": %task%, "success": %success%, "total": %total%, "fiscal": "%name%"}"#.to_string()
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            enabled: true,
            account: default_account(),
            method: default_method(),
            task_id: default_task_id(),
            template: default_template(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrectorConfig {
    #[serde(default)]
    pub device: DeviceSection,

    #[serde(default)]
    pub feed: FeedSettings,

    #[serde(default)]
    pub report: ReportSettings,
}

impl CorrectorConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (corrector.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.device.medium == ConnectionMedium::Network && self.device.port.is_none() {
            return Err(SyncError::InvalidConfig(
                "device.port is required for a network register".into(),
            ));
        }

        let base = Url::parse(&self.feed.base_url)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(SyncError::InvalidUrl(format!(
                "Feed URL must be http or https, got: {}",
                self.feed.base_url
            )));
        }

        if !self.feed.vatin.is_empty()
            && !(matches!(self.feed.vatin.len(), 10 | 12)
                && self.feed.vatin.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(SyncError::InvalidConfig(format!(
                "feed.vatin must be 10 or 12 digits, got: {}",
                self.feed.vatin
            )));
        }

        if self.report.enabled {
            if self.report.account.is_empty() || self.report.method.is_empty() {
                return Err(SyncError::InvalidConfig(
                    "report.account and report.method are required".into(),
                ));
            }
            if self.report.task_id.parse::<u64>().is_err() {
                return Err(SyncError::InvalidConfig(format!(
                    "report.task_id must be numeric, got: {}",
                    self.report.task_id
                )));
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(medium) = std::env::var("CORRECTOR_DEVICE_MEDIUM") {
            match medium.parse() {
                Ok(parsed) => self.device.medium = parsed,
                Err(_) => warn!(medium = %medium, "Unknown connection medium in environment"),
            }
        }

        if let Ok(address) = std::env::var("CORRECTOR_DEVICE_ADDRESS") {
            debug!(address = %address, "Overriding device address from environment");
            self.device.address = address;
        }

        if let Ok(port) = std::env::var("CORRECTOR_DEVICE_PORT") {
            if let Ok(p) = port.parse::<u16>() {
                self.device.port = Some(p);
            }
        }

        if let Ok(name) = std::env::var("CORRECTOR_DEVICE_NAME") {
            self.device.name = name;
        }

        if let Ok(url) = std::env::var("CORRECTOR_OFD_URL") {
            self.feed.base_url = url;
        }

        if let Ok(vatin) = std::env::var("CORRECTOR_OFD_VATIN") {
            self.feed.vatin = vatin;
        }

        if let Ok(id) = std::env::var("CORRECTOR_OFD_KKT") {
            self.feed.registration_id = id;
        }

        if let Ok(token) = std::env::var("CORRECTOR_OFD_TOKEN") {
            debug!("Overriding OFD token from environment");
            self.feed.token = token;
        }

        if let Ok(account) = std::env::var("CORRECTOR_PLANFIX_ACCOUNT") {
            self.report.account = account;
        }

        if let Ok(task) = std::env::var("CORRECTOR_PLANFIX_TASK") {
            self.report.task_id = task;
        }

        if let Ok(enabled) = std::env::var("CORRECTOR_REPORT_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.report.enabled = true,
                "0" | "false" | "no" => self.report.enabled = false,
                _ => warn!(value = %enabled, "Unknown CORRECTOR_REPORT_ENABLED value"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("ru", "retail", "corrector")
            .map(|dirs| dirs.config_dir().join("corrector.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CorrectorConfig::default();
        assert_eq!(config.device.medium, ConnectionMedium::Usb);
        assert_eq!(config.device.busy_backoff_ms, 1000);
        assert_eq!(config.feed.base_url, "https://ofd.ru");
        assert_eq!(config.report.account, "ats");
        assert!(config.validate().is_ok());
        assert!(!config.feed.is_configured());
    }

    #[test]
    fn test_parse_toml() {
        let config: CorrectorConfig = toml::from_str(
            r#"
            [device]
            medium = "network"
            address = "192.168.1.50"
            port = 5555
            busy_backoff_ms = 250

            [feed]
            vatin = "7700000000"
            registration_id = "0000000000012345"
            token = "secret"

            [report]
            task_id = "1024"
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(
            config.device.connection(),
            FiscalConnection::network("192.168.1.50", 5555)
        );
        assert_eq!(
            config.device.settings().busy_backoff,
            Duration::from_millis(250)
        );
        assert!(config.feed.is_configured());
        assert_eq!(config.report.method, "correction-receipt");
    }

    #[test]
    fn test_config_validation() {
        let mut config = CorrectorConfig::default();

        config.device.medium = ConnectionMedium::Network;
        assert!(config.validate().is_err());
        config.device.port = Some(5555);
        assert!(config.validate().is_ok());

        config.feed.base_url = "ftp://ofd.ru".into();
        assert!(config.validate().is_err());
        config.feed.base_url = "https://ofd.ru".into();

        config.feed.vatin = "12345".into();
        assert!(config.validate().is_err());
        config.feed.vatin = "770000000012".into();
        assert!(config.validate().is_ok());

        config.report.task_id = "abc".into();
        assert!(config.validate().is_err());
        config.report.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_serialization() {
        let config = CorrectorConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[device]"));
        assert!(toml_str.contains("[report]"));
    }
}
