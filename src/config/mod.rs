//! Configuration management
//!
//! YAML-based configuration with support for:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub attendance: AttendanceConfig,
    #[serde(default)]
    pub sales: SalesConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// TLS/HTTPS configuration (if not set, server runs HTTP)
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// TLS/HTTPS configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to TLS certificate file (PEM format)
    pub cert_file: PathBuf,
    /// Path to TLS private key file (PEM format)
    pub key_file: PathBuf,
    /// Minimum TLS version (1.2 or 1.3, defaults to 1.2)
    #[serde(default = "default_min_tls_version")]
    pub min_version: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_min_tls_version() -> String {
    "1.2".to_string()
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_expiry")]
    pub token_expiry_hours: u64,
    #[serde(default = "default_refresh_expiry")]
    pub refresh_token_expiry_days: u64,
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,
}

fn default_token_expiry() -> u64 {
    12
}

fn default_refresh_expiry() -> u64 {
    30
}

fn default_password_min_length() -> usize {
    8
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Log output target (console or file)
    #[serde(default = "default_log_target")]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file name prefix
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    /// Enable daily log rotation
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

/// Log output format
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
    #[default]
    Pretty,
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to console (stdout/stderr) - default for development
    #[default]
    Console,
    /// Log to file with optional rotation - recommended for production
    File,
    /// Log to both console and file
    Both,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_log_target() -> LogTarget {
    LogTarget::Console
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/voltride")
}

fn default_log_prefix() -> String {
    "voltride".to_string()
}

fn default_log_rotation() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: default_log_target(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

/// Attendance policy knobs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttendanceConfig {
    /// Open attendance records are force-closed after this many hours
    #[serde(default = "default_auto_logout_hours")]
    pub auto_logout_hours: u64,
    /// Hours worked beyond this count as overtime
    #[serde(default = "default_standard_day_hours")]
    pub standard_day_hours: f64,
}

fn default_auto_logout_hours() -> u64 {
    9
}

fn default_standard_day_hours() -> f64 {
    9.0
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            auto_logout_hours: default_auto_logout_hours(),
            standard_day_hours: default_standard_day_hours(),
        }
    }
}

/// Sales and warranty policy knobs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SalesConfig {
    /// GST percentage applied to order totals
    #[serde(default = "default_tax_rate")]
    pub tax_rate_percent: f64,
    /// Warranty period activated with each sale
    #[serde(default = "default_warranty_months")]
    pub warranty_period_months: u32,
    /// Free services included with each sale
    #[serde(default = "default_free_services")]
    pub free_services: u32,
    /// Expected delivery lead time for approved dealer orders
    #[serde(default = "default_order_lead_days")]
    pub dealer_order_lead_days: u32,
}

fn default_tax_rate() -> f64 {
    18.0
}

fn default_warranty_months() -> u32 {
    24
}

fn default_free_services() -> u32 {
    4
}

fn default_order_lead_days() -> u32 {
    7
}

impl Default for SalesConfig {
    fn default() -> Self {
        Self {
            tax_rate_percent: default_tax_rate(),
            warranty_period_months: default_warranty_months(),
            free_services: default_free_services(),
            dealer_order_lead_days: default_order_lead_days(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                workers: default_workers(),
                request_timeout_secs: None,
                tls: None,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                token_expiry_hours: default_token_expiry(),
                refresh_token_expiry_days: default_refresh_expiry(),
                password_min_length: default_password_min_length(),
            },
            database: DatabaseConfig {
                url: "sqlite://./data/voltride.db".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            logging: LoggingConfig::default(),
            attendance: AttendanceConfig::default(),
            sales: SalesConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables (prefixed with VOLTRIDE_)
    pub fn load() -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        // Check for config path override from environment
        let config_path = std::env::var("VOLTRIDE_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = if let Some(ref path) = config_path {
            if path.exists() {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                serde_norway::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file: {:?}", path))?
            } else {
                AppConfig::default()
            }
        } else {
            AppConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            PathBuf::from("/etc/voltride/config.yaml"),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("VOLTRIDE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("VOLTRIDE_SERVER_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(url) = std::env::var("VOLTRIDE_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(secret) = std::env::var("VOLTRIDE_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(level) = std::env::var("VOLTRIDE_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            anyhow::bail!(
                "auth.jwt_secret is required (set it in config.yaml or VOLTRIDE_JWT_SECRET)"
            );
        }
        if self.auth.jwt_secret.len() < 32 {
            anyhow::bail!("auth.jwt_secret must be at least 32 characters");
        }
        if self.database.url.is_empty() {
            anyhow::bail!("database.url is required");
        }
        if let Some(ref tls) = self.server.tls {
            if !matches!(tls.min_version.as_str(), "1.2" | "1.3") {
                anyhow::bail!("server.tls.min_version must be \"1.2\" or \"1.3\"");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "a-test-secret-that-is-long-enough-to-pass".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5080);
        assert_eq!(config.auth.token_expiry_hours, 12);
        assert_eq!(config.auth.refresh_token_expiry_days, 30);
        assert_eq!(config.sales.tax_rate_percent, 18.0);
        assert_eq!(config.sales.free_services, 4);
        assert_eq!(config.attendance.auto_logout_hours, 9);
    }

    #[test]
    fn test_validate_rejects_missing_secret() {
        let config = AppConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "too-short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
server:
  host: 0.0.0.0
  port: 8443
auth:
  jwt_secret: "a-test-secret-that-is-long-enough-to-pass"
database:
  url: "sqlite://./data/test.db"
sales:
  tax_rate_percent: 12.5
"#;
        let config: AppConfig = serde_norway::from_str(yaml).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8443);
        assert_eq!(config.sales.tax_rate_percent, 12.5);
        // Unset sections fall back to defaults
        assert_eq!(config.attendance.auto_logout_hours, 9);
    }
}
