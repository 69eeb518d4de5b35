use crate::device::Device;
use crate::error::{Result, SentryError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default configuration file name, relative to the working directory
pub const CONFIG_FILE: &str = "config.json5";

pub const DEFAULT_PORT: u16 = 3031;
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 2;
pub const DEFAULT_DEBOUNCE_INTERVAL_SECS: u64 = 5 * 60;
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Application configuration structure
///
/// Loaded once at startup from a JSON5 file, then overlaid with environment
/// variables for secrets and the debug flag.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Port the HTTP API listens on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Seconds between two scan ticks
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    /// Upper bound on a single device probe
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Disables probing and log mutation entirely
    #[serde(default)]
    pub debug: bool,
    /// Where the device log JSON document is persisted
    #[serde(default = "default_device_log_file")]
    pub device_log_file: PathBuf,
    /// Where the notification settings JSON document is persisted
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,
    /// Directory with the static frontend, served at `/` when present
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Monitored devices, in probing order
    #[serde(default)]
    pub devices: Vec<Device>,
}

/// Debounce and quiet-hours policy for outbound notifications
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct NotificationConfig {
    #[serde(default = "default_debounce_interval_secs")]
    pub debounce_interval_secs: u64,
    /// First local hour (inclusive) in which notifications may be sent
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    /// Local hour (exclusive) after which notifications are suppressed
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,
    /// Allow devices flagged `notify_on_same_status` to re-notify on
    /// repeated identical readings
    #[serde(default)]
    pub repeat_same_status: bool,
}

/// Telegram Bot API settings. Credentials normally come from the environment.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    #[serde(default, skip_serializing)]
    pub bot_token: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_scan_interval_secs() -> u64 {
    DEFAULT_SCAN_INTERVAL_SECS
}

fn default_probe_timeout_secs() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECS
}

fn default_device_log_file() -> PathBuf {
    PathBuf::from("device_log.json")
}

fn default_settings_file() -> PathBuf {
    PathBuf::from("notification_settings.json")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_debounce_interval_secs() -> u64 {
    DEFAULT_DEBOUNCE_INTERVAL_SECS
}

fn default_start_hour() -> u32 {
    8
}

fn default_end_hour() -> u32 {
    24
}

fn default_telegram_api_base() -> String {
    DEFAULT_TELEGRAM_API_BASE.to_string()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            debounce_interval_secs: default_debounce_interval_secs(),
            start_hour: default_start_hour(),
            end_hour: default_end_hour(),
            repeat_same_status: false,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_telegram_api_base(),
            bot_token: None,
            chat_id: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            scan_interval_secs: default_scan_interval_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            debug: false,
            device_log_file: default_device_log_file(),
            settings_file: default_settings_file(),
            static_dir: default_static_dir(),
            notifications: NotificationConfig::default(),
            telegram: TelegramConfig::default(),
            devices: Vec::new(),
        }
    }
}

impl Config {
    /// Load the application configuration from a JSON5 file.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read, parsed or
    /// fails validation
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!("Loading application configuration from {}", path.display());
        let config_str = fs::read_to_string(path)?;
        let config = Self::parse(&config_str)?;
        tracing::info!(
            devices = config.devices.len(),
            "Configuration loaded successfully"
        );
        Ok(config)
    }

    /// Parse and validate configuration text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON5 or fails validation
    pub fn parse(config_str: &str) -> Result<Self> {
        let config: Config = json5::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from environment variables.
    ///
    /// `lookup` is normally `std::env::var(..).ok()`; recognised keys are
    /// `DEBUG`, `PORT`, `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(debug) = lookup("DEBUG") {
            self.debug = crate::utils::parse_flag(&debug);
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.trim().parse().ok()) {
            self.port = port;
        }
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = Some(token);
        }
        if let Some(chat_id) = lookup("TELEGRAM_CHAT_ID").filter(|c| !c.trim().is_empty()) {
            self.telegram.chat_id = Some(chat_id);
        }
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `SentryError::Config` describing the first problem found
    pub fn validate(&self) -> Result<()> {
        let window = &self.notifications;
        if window.start_hour >= window.end_hour || window.end_hour > 24 {
            return Err(SentryError::Config(format!(
                "Notification window [{}, {}) is invalid",
                window.start_hour, window.end_hour
            )));
        }

        if self.scan_interval_secs == 0 {
            return Err(SentryError::Config(
                "scan_interval_secs must be greater than zero".to_string(),
            ));
        }

        if self.probe_timeout_secs == 0 {
            return Err(SentryError::Config(
                "probe_timeout_secs must be greater than zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for device in &self.devices {
            if device.address.trim().is_empty() {
                return Err(SentryError::Config(
                    "Device address cannot be empty".to_string(),
                ));
            }
            // Addresses are handed to `ping` as its last argument
            if device.address.starts_with('-')
                || device.address.chars().any(char::is_whitespace)
            {
                return Err(SentryError::Config(format!(
                    "Invalid device address: {:?}",
                    device.address
                )));
            }
            if !seen.insert(device.address.as_str()) {
                return Err(SentryError::Config(format!(
                    "Duplicate device address: {}",
                    device.address
                )));
            }
        }

        if Url::parse(&self.telegram.api_base).is_err() {
            return Err(SentryError::Config(format!(
                "Invalid URL format: {}",
                self.telegram.api_base
            )));
        }

        Ok(())
    }

    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"{
        // comments are allowed in json5
        port: 4000,
        devices: [
            { address: "192.168.28.40", name: "Kir", messages: { online: "{name} is home.", offline: "{name} left home." } },
            { address: "192.168.28.22", name: "TV" },
        ],
    }"#;

    #[test]
    fn test_parse_applies_defaults() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.scan_interval_secs, DEFAULT_SCAN_INTERVAL_SECS);
        assert_eq!(config.probe_timeout_secs, DEFAULT_PROBE_TIMEOUT_SECS);
        assert_eq!(config.notifications, NotificationConfig::default());
        assert_eq!(config.telegram.api_base, DEFAULT_TELEGRAM_API_BASE);
        assert_eq!(config.device_log_file, PathBuf::from("device_log.json"));
        assert!(!config.debug);
    }

    #[test]
    fn test_parse_keeps_device_order() {
        let config = Config::parse(SAMPLE).unwrap();
        let addresses: Vec<&str> = config.devices.iter().map(|d| d.address.as_str()).collect();
        assert_eq!(addresses, vec!["192.168.28.40", "192.168.28.22"]);
        assert_eq!(
            config.devices[0].messages.online.as_deref(),
            Some("{name} is home.")
        );
    }

    #[test]
    fn test_validate_rejects_bad_window() {
        let err = Config::parse("{ notifications: { start_hour: 22, end_hour: 8 } }").unwrap_err();
        assert!(matches!(err, SentryError::Config(_)));

        let err = Config::parse("{ notifications: { start_hour: 0, end_hour: 25 } }").unwrap_err();
        assert!(matches!(err, SentryError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_duplicate_devices() {
        let err = Config::parse(
            r#"{ devices: [ { address: "10.0.0.1" }, { address: "10.0.0.1" } ] }"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: Duplicate device address: 10.0.0.1"
        );
    }

    #[test]
    fn test_validate_rejects_empty_address() {
        let err = Config::parse(r#"{ devices: [ { address: " " } ] }"#).unwrap_err();
        assert!(matches!(err, SentryError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_option_like_address() {
        for address in ["-f", "--help", "10.0.0.1 -c 100"] {
            let config = Config {
                devices: vec![Device::new(address)],
                ..Config::default()
            };
            let err = config.validate().unwrap_err();
            assert!(
                err.to_string().starts_with("Invalid configuration: Invalid device address"),
                "{address} was accepted"
            );
        }
    }

    #[test]
    fn test_validate_rejects_invalid_api_base() {
        let err = Config::parse(r#"{ telegram: { api_base: "not a url" } }"#).unwrap_err();
        assert!(matches!(err, SentryError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        assert!(Config::parse("{ scan_interval_secs: 0 }").is_err());
        assert!(Config::parse("{ probe_timeout_secs: 0 }").is_err());
    }

    #[test]
    fn test_apply_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DEBUG", "yes"),
            ("PORT", "8080"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "42"),
        ]);
        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| (*v).to_string()));

        assert!(config.debug);
        assert_eq!(config.port, 8080);
        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.telegram.chat_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_apply_env_ignores_blank_credentials() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "TELEGRAM_BOT_TOKEN" | "TELEGRAM_CHAT_ID" => Some(String::new()),
            "DEBUG" => Some("0".to_string()),
            _ => None,
        });
        assert!(!config.debug);
        assert!(config.telegram.bot_token.is_none());
        assert!(config.telegram.chat_id.is_none());
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::parse(include_str!("../config.example.json5")).unwrap();
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[1].display_name(), "TV");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here/config.json5")).unwrap_err();
        assert!(matches!(err, SentryError::Io(_)));
    }
}
