use crate::config::RequestLoggingConfig;
use crate::registry::SinkRegistry;
use crate::service::RequestLogger;
use crate::sink::RequestLogSink;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Ошибка установки глобального `tracing` subscriber'а.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("invalid log filter directive: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("global tracing subscriber already set: {0}")]
    AlreadySet(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Установить глобальный subscriber для внутренней диагностики библиотеки.
///
/// Фильтр берётся из `RUST_LOG`, при его отсутствии используется `info`.
pub fn init_tracing() -> Result<(), InitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    install(filter)
}

/// То же, что [`init_tracing`], но с явной директивой фильтра
/// (например, `"request_log_sink=debug,info"`).
pub fn init_tracing_with_filter(directive: &str) -> Result<(), InitError> {
    install(EnvFilter::try_new(directive)?)
}

fn install(filter: EnvFilter) -> Result<(), InitError> {
    let subscriber = Registry::default().with(filter).with(fmt::layer());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Build a [`RequestLogger`] from configuration alone.
///
/// Built-in sinks come from `config.sinks`. With `async-logging` enabled this
/// must be called from within a Tokio runtime.
pub fn init_request_logging(config: RequestLoggingConfig) -> RequestLogger {
    init_request_logging_with_sinks(config, Vec::new())
}

/// Like [`init_request_logging`], appending `custom` sinks after the built-ins.
pub fn init_request_logging_with_sinks(
    config: RequestLoggingConfig,
    custom: Vec<Box<dyn RequestLogSink>>,
) -> RequestLogger {
    let sinks = SinkRegistry::discover(&config, custom);
    tracing::info!(
        sinks = ?sinks.names(),
        sampling_rate = config.sampling_rate,
        async_logging = config.async_logging,
        "request logging initialised"
    );
    RequestLogger::new(config, sinks)
}
