//! Configuration types and loading for the responder.

use crate::error::ServerError;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Default zonekeeper.yaml embedded at compile time
pub const DEFAULT_CONFIG_YAML: &str = include_str!("../../zonekeeper.yaml");

/// Main configuration struct
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub dns: DnsConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values that would only fail later, at bind or fetch time
    pub fn validate(&self) -> Result<(), ServerError> {
        self.dns
            .listen
            .parse::<std::net::SocketAddr>()
            .map_err(|e| {
                ServerError::Config(format!("dns.listen {:?}: {}", self.dns.listen, e))
            })?;

        let uri = self
            .source
            .endpoint
            .parse::<hyper::Uri>()
            .map_err(|e| {
                ServerError::Config(format!("source.endpoint {:?}: {}", self.source.endpoint, e))
            })?;
        match uri.scheme_str() {
            Some("http") | Some("https") => {}
            _ => {
                return Err(ServerError::Config(format!(
                    "source.endpoint {:?}: scheme must be http or https",
                    self.source.endpoint
                )))
            }
        }

        if self.source.timeout_ms == 0 {
            return Err(ServerError::Config(
                "source.timeout_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

// ============== DNS Config ==============

#[derive(Debug, Deserialize, Clone)]
pub struct DnsConfig {
    #[serde(default = "default_dns_listen")]
    pub listen: String,
}

impl Default for DnsConfig {
    fn default() -> Self {
        DnsConfig {
            listen: default_dns_listen(),
        }
    }
}

// ============== Zone Source Config ==============

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_source_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_source_username")]
    pub username: String,
    #[serde(default = "default_source_password")]
    pub password: String,
    /// Whole-request timeout covering connect, headers and body
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
}

fn default_source_endpoint() -> String {
    "http://localhost:8080/dns".to_string()
}

fn default_source_username() -> String {
    "your-username".to_string()
}

fn default_source_password() -> String {
    "your-password".to_string()
}

fn default_source_timeout_ms() -> u64 {
    5000
}

fn default_max_body_bytes() -> u64 {
    16 * 1024 * 1024 // 16MB
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            endpoint: default_source_endpoint(),
            username: default_source_username(),
            password: default_source_password(),
            timeout_ms: default_source_timeout_ms(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

// ============== Console Config ==============

#[derive(Debug, Deserialize, Clone)]
pub struct ConsoleConfig {
    #[serde(default = "default_console_enabled")]
    pub enabled: bool,
}

fn default_console_enabled() -> bool {
    true
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            enabled: default_console_enabled(),
        }
    }
}

// ============== Logging Config ==============

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LogRotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log each DNS query at info level (debug otherwise)
    #[serde(default = "default_log_queries")]
    pub log_queries: bool,
    #[serde(default)]
    pub format: LogFormat,
    /// File logging configuration
    #[serde(default)]
    pub file: Option<FileLoggingConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FileLoggingConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
    #[serde(default)]
    pub rotation: LogRotation,
    /// Days to keep old log files (0 = keep forever)
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,
    /// Compress rotated log files with gzip
    #[serde(default = "default_compress")]
    pub compress: bool,
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_file_prefix() -> String {
    "zonekeeper.log".to_string()
}

fn default_max_age_days() -> u64 {
    7
}

fn default_compress() -> bool {
    true
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        FileLoggingConfig {
            log_dir: default_log_dir(),
            file_prefix: default_log_file_prefix(),
            rotation: LogRotation::Daily,
            max_age_days: default_max_age_days(),
            compress: default_compress(),
        }
    }
}

fn default_log_queries() -> bool {
    false
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_queries: default_log_queries(),
            format: LogFormat::Text,
            file: None,
        }
    }
}

// ============== Default Values ==============

pub fn default_dns_listen() -> String {
    "127.0.0.1:53".to_string()
}

// ============== Config Loading ==============

/// Get the directory containing the executable
fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
}

/// Load configuration from file, falling back to defaults when none exists
pub fn load_config(path: Option<&str>) -> Result<Config, ServerError> {
    let config_paths = if let Some(p) = path {
        vec![PathBuf::from(p)]
    } else {
        let mut paths = vec![PathBuf::from("zonekeeper.yaml")];
        if let Some(dir) = exe_dir() {
            paths.push(dir.join("zonekeeper.yaml"));
        }
        paths
    };

    for config_path in config_paths {
        if config_path.exists() {
            println!("Loading config from: {}", config_path.display());
            let content = fs::read_to_string(&config_path)?;
            return parse_config(&content).map_err(|e| match e {
                ServerError::Config(msg) => {
                    ServerError::Config(format!("{}: {}", config_path.display(), msg))
                }
                other => other,
            });
        }
    }

    Ok(Config::default())
}

/// Parse a YAML document into a Config
pub fn parse_config(content: &str) -> Result<Config, ServerError> {
    serde_yaml_ng::from_str(content).map_err(|e| ServerError::Config(e.to_string()))
}

// ============== Unit Tests ==============

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dns_listen() {
        assert_eq!(default_dns_listen(), "127.0.0.1:53");
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.dns.listen, "127.0.0.1:53");
        assert_eq!(config.source.endpoint, "http://localhost:8080/dns");
        assert_eq!(config.source.username, "your-username");
        assert_eq!(config.source.password, "your-password");
        assert_eq!(config.source.timeout_ms, 5000);
        assert_eq!(config.source.max_body_bytes, 16 * 1024 * 1024);
        assert!(config.console.enabled);
        assert!(config.logging.file.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_embedded_default_config_parses() {
        let config = parse_config(DEFAULT_CONFIG_YAML).unwrap();
        assert_eq!(config.dns.listen, default_dns_listen());
        assert_eq!(config.source.endpoint, default_source_endpoint());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialization_full() {
        let yaml = r#"
dns:
  listen: "0.0.0.0:5353"
source:
  endpoint: "https://zones.example.net/export"
  username: "ops"
  password: "s3cret"
  timeout_ms: 1500
  max_body_bytes: 1024
console:
  enabled: false
logging:
  format: json
  log_queries: true
  file:
    log_dir: "/var/log/zonekeeper"
    rotation: hourly
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.dns.listen, "0.0.0.0:5353");
        assert_eq!(config.source.endpoint, "https://zones.example.net/export");
        assert_eq!(config.source.username, "ops");
        assert_eq!(config.source.password, "s3cret");
        assert_eq!(config.source.timeout_ms, 1500);
        assert_eq!(config.source.max_body_bytes, 1024);
        assert!(!config.console.enabled);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.logging.log_queries);

        let file = config.logging.file.unwrap();
        assert_eq!(file.log_dir, "/var/log/zonekeeper");
        assert_eq!(file.file_prefix, "zonekeeper.log");
        assert_eq!(file.rotation, LogRotation::Hourly);
        assert_eq!(file.max_age_days, 7);
        assert!(file.compress);
    }

    #[test]
    fn test_config_deserialization_partial() {
        let yaml = r#"
source:
  username: "ops"
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.source.username, "ops");
        assert_eq!(config.source.password, "your-password");
        assert_eq!(config.dns.listen, "127.0.0.1:53");
    }

    #[test]
    fn test_config_deserialization_empty() {
        let config = parse_config("").unwrap();
        assert_eq!(config.dns.listen, "127.0.0.1:53");
    }

    #[test]
    fn test_config_invalid_yaml() {
        let result = parse_config("dns: [not, a, map]");
        assert!(matches!(result, Err(ServerError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        let mut config = Config::default();
        config.source.endpoint = "ftp://zones.example.net/".to_string();
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_listen() {
        let mut config = Config::default();
        config.dns.listen = "localhost".to_string();
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.source.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_config_nonexistent_file() {
        let config = load_config(Some("/nonexistent/path/zonekeeper.yaml")).unwrap();
        assert_eq!(config.dns.listen, "127.0.0.1:53");
    }

    #[test]
    fn test_log_format_deserialization() {
        let yaml = "format: json";
        let config: LoggingConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_file_logging_config_defaults() {
        let config = FileLoggingConfig::default();
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.file_prefix, "zonekeeper.log");
        assert_eq!(config.rotation, LogRotation::Daily);
        assert_eq!(config.max_age_days, 7);
        assert!(config.compress);
    }
}
