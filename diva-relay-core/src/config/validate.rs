//! Configuration validation rules.

use super::schema::Config;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["text", "json"];
const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    let http = &config.channels.http;
    if http.timeout_secs == 0 {
        errors.push("channels.http.timeout_secs must be > 0".to_string());
    } else if http.timeout_secs > MAX_TIMEOUT_SECS {
        errors.push(format!(
            "channels.http.timeout_secs must be <= {}",
            MAX_TIMEOUT_SECS
        ));
    }
    if http.timeout_notice.trim().is_empty() {
        errors.push("channels.http.timeout_notice must not be empty".to_string());
    }

    if config.gateway.host.trim().is_empty() {
        errors.push("gateway.host must not be empty".to_string());
    }
    if config.gateway.port == 0 {
        errors.push("gateway.port must be > 0".to_string());
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(format!(
            "logging.level must be one of {}",
            LOG_LEVELS.join(", ")
        ));
    }
    let format = config.logging.format.to_ascii_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        errors.push(format!(
            "logging.format must be one of {}",
            LOG_FORMATS.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}
