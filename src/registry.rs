use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::RequestLoggingConfig;
use crate::console_sink::ConsoleSink;
use crate::file_sink::FileSink;
use crate::sink::RequestLogSink;

/// Built-in sink kinds that can be selected by name in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Console,
    File,
}

/// Parse a configured sink name.
///
/// Examples:
/// - "console"
/// - "file"
pub fn parse_sink_name(name: &str) -> Result<SinkKind, SinkNameError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "console" | "stdout" => Ok(SinkKind::Console),
        "file" => Ok(SinkKind::File),
        _ => Err(SinkNameError::Unknown(name.to_string())),
    }
}

/// Error type returned when parsing a sink name.
#[derive(thiserror::Error, Debug)]
pub enum SinkNameError {
    #[error("unknown sink name: {0:?}")]
    Unknown(String),
}

/// Create an uninitialised built-in sink.
pub fn make_sink(kind: SinkKind) -> Box<dyn RequestLogSink> {
    match kind {
        SinkKind::Console => Box::new(ConsoleSink::new()),
        SinkKind::File => Box::new(FileSink::new()),
    }
}

/// Ordered, immutable list of active sinks.
///
/// Built once at startup. Dispatch walks the sinks in the order they were
/// registered: configured built-ins first, then custom sinks in the order
/// they were supplied.
#[derive(Clone)]
pub struct SinkRegistry {
    sinks: Vec<Arc<dyn RequestLogSink>>,
}

impl SinkRegistry {
    /// Register the built-ins named in `config.sinks` followed by `custom`.
    ///
    /// Unknown names are skipped with a warning.
    pub fn discover(config: &RequestLoggingConfig, custom: Vec<Box<dyn RequestLogSink>>) -> Self {
        let mut candidates: Vec<Box<dyn RequestLogSink>> = Vec::new();
        for name in &config.sinks {
            match parse_sink_name(name) {
                Ok(kind) => candidates.push(make_sink(kind)),
                Err(e) => warn!(error = %e, "skipping sink"),
            }
        }
        candidates.extend(custom);
        Self::from_sinks(config, candidates)
    }

    /// Initialise and register exactly `sinks`, in order.
    ///
    /// A sink whose `init` fails is left out. If nothing is left, a single
    /// console sink is installed so events are never silently lost.
    pub fn from_sinks(config: &RequestLoggingConfig, sinks: Vec<Box<dyn RequestLogSink>>) -> Self {
        let mut active: Vec<Arc<dyn RequestLogSink>> = Vec::with_capacity(sinks.len().max(1));
        for mut sink in sinks {
            match sink.init(config) {
                Ok(()) => {
                    debug!(sink = sink.name(), "registered request log sink");
                    active.push(Arc::from(sink));
                }
                Err(e) => warn!(sink = sink.name(), error = %e, "sink init failed, not registering"),
            }
        }

        if active.is_empty() {
            let mut fallback = ConsoleSink::new();
            if let Err(e) = fallback.init(config) {
                warn!(error = %e, "default console sink init failed");
            }
            active.push(Arc::new(fallback));
        }

        Self { sinks: active }
    }

    pub fn sinks(&self) -> &[Arc<dyn RequestLogSink>] {
        &self.sinks
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Names in dispatch order.
    pub fn names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Call `close` on every sink, logging failures.
    pub async fn close_all(&self) {
        for sink in &self.sinks {
            if let Err(e) = sink.close().await {
                warn!(sink = sink.name(), error = %e, "sink close failed");
            }
        }
    }
}
