use crate::env::{self, env_list, env_or, env_parse};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

/// Fallback for an unparseable `max-file-size`.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Error type returned when loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid file size {0:?}")]
    InvalidSize(String),
}

/// Rotation strategy selected by `log-file-strategy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Daily,
    Size,
}

impl StrategyKind {
    /// Resolve a configured strategy name. Unknown names fall back to daily.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "daily" => StrategyKind::Daily,
            "size" => StrategyKind::Size,
            other => {
                warn!(strategy = other, "unknown log file strategy, using daily");
                StrategyKind::Daily
            }
        }
    }
}

/// Every knob of the request logger.
///
/// Keys are kebab-case in TOML (`sampling-rate`, `log-file-base-dir`, ...) and
/// every field has a default, so a partial file is fine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RequestLoggingConfig {
    /// Master switch.
    pub enabled: bool,
    /// Percent (0-100) of logical requests that are logged.
    pub sampling_rate: f64,
    /// Dispatch through the worker pool instead of the calling task.
    pub async_logging: bool,
    pub async_workers: usize,
    pub async_queue_capacity: usize,
    /// How long shutdown waits for queued events to drain.
    pub shutdown_timeout_secs: u64,

    pub object_pool_enabled: bool,
    pub pool_max_size: usize,

    /// Built-in sinks to install, by name (`console`, `file`).
    pub sinks: Vec<String>,

    pub log_file_base_dir: PathBuf,
    pub log_file_strategy: String,
    /// Files kept by the daily strategy.
    pub max_history: usize,
    /// Size threshold for the size strategy, e.g. `100MB`.
    pub max_file_size: String,
    /// Files kept by the size strategy.
    pub max_files: usize,

    pub trace_id_header: String,
    pub exclude_headers: Vec<String>,
    pub exclude_paths: Vec<String>,
    pub log_headers: bool,
    pub log_request_body: bool,
    pub log_response: bool,
    pub request_body_max_length: usize,
    pub response_max_length: usize,

    pub console_color: bool,
    pub json_pretty_print: bool,
    pub show_timestamp: bool,
    pub separator: String,
    pub request_start_flag: String,
    pub request_end_flag: String,
    pub request_error_flag: String,
}

impl Default for RequestLoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sampling_rate: 100.0,
            async_logging: false,
            async_workers: 4,
            async_queue_capacity: 1000,
            shutdown_timeout_secs: 60,
            object_pool_enabled: true,
            pool_max_size: 100,
            sinks: vec!["console".to_string()],
            log_file_base_dir: PathBuf::from("data"),
            log_file_strategy: "daily".to_string(),
            max_history: 30,
            max_file_size: "100MB".to_string(),
            max_files: 10,
            trace_id_header: "X-Trace-Id".to_string(),
            exclude_headers: vec!["Authorization".to_string(), "Cookie".to_string()],
            exclude_paths: [
                "/actuator",
                "/swagger",
                "/v3/api-docs",
                "/webjars",
                "/favicon.ico",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            log_headers: true,
            log_request_body: true,
            log_response: true,
            request_body_max_length: 1000,
            response_max_length: 1000,
            console_color: true,
            json_pretty_print: false,
            show_timestamp: true,
            separator: "===================".to_string(),
            request_start_flag: ">>> Request Start >>>".to_string(),
            request_end_flag: "<<< Request End <<<".to_string(),
            request_error_flag: "!!! Request Error !!!".to_string(),
        }
    }
}

impl RequestLoggingConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Build a config from `REQUEST_LOGGING_*` environment variables on top
    /// of the defaults. Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            enabled: env_parse(env::ENABLED_ENV, d.enabled),
            sampling_rate: env_parse(env::SAMPLING_RATE_ENV, d.sampling_rate),
            async_logging: env_parse(env::ASYNC_LOGGING_ENV, d.async_logging),
            async_workers: env_parse(env::ASYNC_WORKERS_ENV, d.async_workers),
            async_queue_capacity: env_parse(env::ASYNC_QUEUE_CAPACITY_ENV, d.async_queue_capacity),
            object_pool_enabled: env_parse(env::OBJECT_POOL_ENABLED_ENV, d.object_pool_enabled),
            pool_max_size: env_parse(env::POOL_MAX_SIZE_ENV, d.pool_max_size),
            sinks: env_list(env::SINKS_ENV).unwrap_or(d.sinks),
            log_file_base_dir: PathBuf::from(env_or(
                env::LOG_FILE_BASE_DIR_ENV,
                &d.log_file_base_dir.to_string_lossy(),
            )),
            log_file_strategy: env_or(env::LOG_FILE_STRATEGY_ENV, &d.log_file_strategy),
            max_history: env_parse(env::MAX_HISTORY_ENV, d.max_history),
            max_file_size: env_or(env::MAX_FILE_SIZE_ENV, &d.max_file_size),
            max_files: env_parse(env::MAX_FILES_ENV, d.max_files),
            exclude_headers: env_list(env::EXCLUDE_HEADERS_ENV).unwrap_or(d.exclude_headers),
            request_body_max_length: env_parse(
                env::REQUEST_BODY_MAX_LENGTH_ENV,
                d.request_body_max_length,
            ),
            response_max_length: env_parse(env::RESPONSE_MAX_LENGTH_ENV, d.response_max_length),
            ..d
        }
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        StrategyKind::from_name(&self.log_file_strategy)
    }

    /// `max-file-size` in bytes, or [`DEFAULT_MAX_FILE_SIZE`] when invalid.
    pub fn max_file_size_bytes(&self) -> u64 {
        parse_size(&self.max_file_size).unwrap_or_else(|e| {
            warn!(error = %e, "using default max file size of 100MB");
            DEFAULT_MAX_FILE_SIZE
        })
    }

    /// Whether `name` is listed in `exclude-headers` (case-insensitive).
    pub fn is_excluded_header(&self, name: &str) -> bool {
        self.exclude_headers
            .iter()
            .any(|h| h.eq_ignore_ascii_case(name))
    }

    /// Whether requests to `uri` are skipped entirely.
    pub fn is_excluded_path(&self, uri: &str) -> bool {
        self.exclude_paths.iter().any(|p| uri.contains(p.as_str()))
    }
}

/// Parse sizes like `512`, `10B`, `64kb`, `100MB`, `1GB`.
pub fn parse_size(raw: &str) -> Result<u64, ConfigError> {
    let upper = raw.trim().to_ascii_uppercase();
    let (digits, multiplier) = if let Some(n) = upper.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = upper.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix('B') {
        (n, 1)
    } else {
        (upper.as_str(), 1)
    };

    digits
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| ConfigError::InvalidSize(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_size_accepts_units() {
        assert_eq!(parse_size("512").unwrap(), 512);
        assert_eq!(parse_size("10B").unwrap(), 10);
        assert_eq!(parse_size("64kb").unwrap(), 64 * 1024);
        assert_eq!(parse_size(" 100MB ").unwrap(), 100 * 1024 * 1024);
        assert_eq!(parse_size("1GB").unwrap(), 1024 * 1024 * 1024);
        assert!(parse_size("lots").is_err());
        assert!(parse_size("-1MB").is_err());
    }

    #[test]
    fn invalid_size_falls_back_to_default() {
        let config = RequestLoggingConfig {
            max_file_size: "huge".into(),
            ..Default::default()
        };
        assert_eq!(config.max_file_size_bytes(), DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn unknown_strategy_resolves_to_daily() {
        assert_eq!(StrategyKind::from_name("size"), StrategyKind::Size);
        assert_eq!(StrategyKind::from_name(" DAILY "), StrategyKind::Daily);
        assert_eq!(StrategyKind::from_name("hourly"), StrategyKind::Daily);
    }

    #[test]
    fn toml_overrides_only_given_keys() {
        let config = RequestLoggingConfig::from_toml_str(
            r#"
            sampling-rate = 25.0
            async-logging = true
            log-file-strategy = "size"
            max-file-size = "1KB"
            sinks = ["console", "file"]
            exclude-headers = ["X-Api-Key"]
            "#,
        )
        .unwrap();

        assert_eq!(config.sampling_rate, 25.0);
        assert!(config.async_logging);
        assert_eq!(config.strategy_kind(), StrategyKind::Size);
        assert_eq!(config.max_file_size_bytes(), 1024);
        assert_eq!(config.sinks, vec!["console", "file"]);
        assert!(config.is_excluded_header("x-api-key"));
        assert!(!config.is_excluded_header("Authorization"));
        assert_eq!(config.max_history, 30);
        assert!(config.enabled);
    }

    #[test]
    fn default_excludes() {
        let config = RequestLoggingConfig::default();
        assert!(config.is_excluded_header("authorization"));
        assert!(config.is_excluded_header("Cookie"));
        assert!(config.is_excluded_path("/actuator/health"));
        assert!(!config.is_excluded_path("/api/orders"));
    }
}
