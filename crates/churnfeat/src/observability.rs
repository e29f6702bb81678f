//! Logging configuration and initialization for the command-line tools.

use std::env;

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_LEVEL_VAR: &str = "CHURNFEAT_LOG_LEVEL";
/// Environment variable selecting `pretty` or `json` output.
pub const LOG_FORMAT_VAR: &str = "CHURNFEAT_LOG_FORMAT";
/// Environment variable toggling the event target in log lines.
pub const LOG_TARGET_VAR: &str = "CHURNFEAT_LOG_TARGET";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable, multi-line.
    Pretty,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `churnfeat_pipeline=debug`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Whether to print the event target.
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty, include_target: true }
    }
}

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingInitError {
    /// A global subscriber is already set.
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Read logging settings from the process environment.
#[must_use]
pub fn logging_config_from_env() -> LoggingConfig {
    logging_config_from_lookup(|key| env::var(key).ok())
}

/// Read logging settings through `lookup`; unset or unparseable values keep
/// their defaults.
pub fn logging_config_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> LoggingConfig {
    let mut config = LoggingConfig::default();

    if let Some(level) = lookup(LOG_LEVEL_VAR) {
        let trimmed = level.trim();
        if !trimmed.is_empty() {
            config.level = trimmed.to_string();
        }
    }
    if let Some(format) = lookup(LOG_FORMAT_VAR).as_deref().and_then(parse_log_format) {
        config.format = format;
    }
    if let Some(include_target) = lookup(LOG_TARGET_VAR).as_deref().and_then(parse_bool) {
        config.include_target = include_target;
    }
    config
}

/// Install a global `tracing` subscriber writing to stderr.
///
/// # Errors
/// Returns `LoggingInitError::AlreadyInitialized` if a subscriber is set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    let env_filter =
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.include_target)
        .with_writer(std::io::stderr)
        .with_ansi(matches!(config.format, LogFormat::Pretty));

    match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
    }
    Ok(())
}

/// Log the start of a command.
pub fn log_app_start(command: &str, config: &LoggingConfig) {
    info!(
        component = command,
        event = "app.start",
        log_level = %config.level,
        log_format = ?config.format,
        include_target = config.include_target
    );
}

fn parse_log_format(raw: &str) -> Option<LogFormat> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" => Some(LogFormat::Pretty),
        _ => None,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(logging_config_from_lookup(lookup(&[])), LoggingConfig::default());
    }

    #[test]
    fn parses_json_level_and_target() {
        let cfg = logging_config_from_lookup(lookup(&[
            (LOG_LEVEL_VAR, "churnfeat_pipeline=debug"),
            (LOG_FORMAT_VAR, "JSON"),
            (LOG_TARGET_VAR, "off"),
        ]));

        assert_eq!(cfg.level, "churnfeat_pipeline=debug");
        assert_eq!(cfg.format, LogFormat::Json);
        assert!(!cfg.include_target);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let cfg = logging_config_from_lookup(lookup(&[
            (LOG_LEVEL_VAR, "  "),
            (LOG_FORMAT_VAR, "yaml"),
            (LOG_TARGET_VAR, "maybe"),
        ]));

        assert_eq!(cfg, LoggingConfig::default());
    }
}
