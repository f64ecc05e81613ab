//! Environment variable names used by this crate for convenient
//! configuration of the request logger from services.
//!
//! These are purely helpers; [`RequestLoggingConfig`](crate::config::RequestLoggingConfig)
//! itself stays decoupled from environment access.

use std::str::FromStr;
use tracing::warn;

/// Master switch, `true`/`false`.
pub const ENABLED_ENV: &str = "REQUEST_LOGGING_ENABLED";

/// Percent of logical requests to log, `0`..`100`.
pub const SAMPLING_RATE_ENV: &str = "REQUEST_LOGGING_SAMPLING_RATE";

/// Dispatch through the worker pool, `true`/`false`.
pub const ASYNC_LOGGING_ENV: &str = "REQUEST_LOGGING_ASYNC";

pub const ASYNC_WORKERS_ENV: &str = "REQUEST_LOGGING_ASYNC_WORKERS";

pub const ASYNC_QUEUE_CAPACITY_ENV: &str = "REQUEST_LOGGING_ASYNC_QUEUE_CAPACITY";

pub const OBJECT_POOL_ENABLED_ENV: &str = "REQUEST_LOGGING_OBJECT_POOL_ENABLED";

pub const POOL_MAX_SIZE_ENV: &str = "REQUEST_LOGGING_POOL_MAX_SIZE";

/// Comma-separated sink names, e.g. `console,file`.
pub const SINKS_ENV: &str = "REQUEST_LOGGING_SINKS";

pub const LOG_FILE_BASE_DIR_ENV: &str = "REQUEST_LOGGING_LOG_FILE_BASE_DIR";

/// `daily` or `size`.
pub const LOG_FILE_STRATEGY_ENV: &str = "REQUEST_LOGGING_LOG_FILE_STRATEGY";

pub const MAX_HISTORY_ENV: &str = "REQUEST_LOGGING_MAX_HISTORY";

/// Size with unit, e.g. `100MB`.
pub const MAX_FILE_SIZE_ENV: &str = "REQUEST_LOGGING_MAX_FILE_SIZE";

pub const MAX_FILES_ENV: &str = "REQUEST_LOGGING_MAX_FILES";

/// Comma-separated header names.
pub const EXCLUDE_HEADERS_ENV: &str = "REQUEST_LOGGING_EXCLUDE_HEADERS";

pub const REQUEST_BODY_MAX_LENGTH_ENV: &str = "REQUEST_LOGGING_REQUEST_BODY_MAX_LENGTH";

pub const RESPONSE_MAX_LENGTH_ENV: &str = "REQUEST_LOGGING_RESPONSE_MAX_LENGTH";

/// Deployment environment name reported in metrics snapshots.
pub const ENVIRONMENT_ENV: &str = "REQUEST_LOGGING_ENV";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read and parse an environment variable, keeping `default` when it is
/// unset or does not parse.
pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring unparseable environment variable");
            default
        }),
        Err(_) => default,
    }
}

/// Read a comma-separated list. Empty items are skipped.
pub fn env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(key).ok().map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}
