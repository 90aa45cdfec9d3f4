//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration for diva-relay
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Channel configuration
    #[serde(default)]
    pub channels: ChannelsConfig,
    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// Channel configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub http: HttpChannelConfig,
}

/// HTTP channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpChannelConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Callers allowed to use the channel (empty = allow all)
    #[serde(default)]
    pub allow_from: Vec<String>,
    /// How long a request waits for the agent's reply
    #[serde(default = "default_reply_timeout")]
    pub timeout_secs: u64,
    /// Text returned to the caller when no reply arrives in time
    #[serde(default = "default_timeout_notice")]
    pub timeout_notice: String,
}

fn default_true() -> bool {
    true
}

fn default_reply_timeout() -> u64 {
    120
}

fn default_timeout_notice() -> String {
    "⏰ The request took too long. Try simplifying the task.".to_string()
}

impl HttpChannelConfig {
    /// Reply timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpChannelConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            allow_from: Vec::new(),
            timeout_secs: default_reply_timeout(),
            timeout_notice: default_timeout_notice(),
        }
    }
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    18790
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_defaults() {
        let config = Config::default();
        assert!(config.channels.http.enabled);
        assert_eq!(config.channels.http.timeout(), Duration::from_secs(120));
        assert!(config.channels.http.allow_from.is_empty());
        assert_eq!(
            config.channels.http.timeout_notice,
            "⏰ The request took too long. Try simplifying the task."
        );
    }

    #[test]
    fn test_timeout_notice_can_be_localized() {
        let config: Config = serde_json::from_str(
            r#"{"channels":{"http":{"timeout_notice":"⏰ Запрос занял слишком много времени. Попробуй упростить задачу."}}}"#,
        )
        .unwrap();
        assert!(config.channels.http.timeout_notice.starts_with("⏰ Запрос"));
        assert_eq!(config.channels.http.timeout_secs, 120);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"channels":{"http":{"timeout_secs":5}}}"#).unwrap();
        assert_eq!(config.channels.http.timeout_secs, 5);
        assert!(config.channels.http.enabled);
        assert_eq!(config.gateway.port, 18790);
        assert_eq!(config.logging.level, "info");
    }
}
