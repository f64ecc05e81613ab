use crate::config::RequestLoggingConfig;
use crate::record::{LogEvent, LogRecord};
use async_trait::async_trait;
use std::error::Error;

/// Outcome of a single sink call.
pub type SinkResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Pluggable consumer of request [`LogRecord`]s (console, file, custom).
///
/// Implementations decide how a record is formatted and where it goes. The
/// dispatcher calls every registered sink in registration order and isolates
/// their failures: an `Err` or a panic from one sink is logged and counted,
/// the remaining sinks still run, and the request being served never sees it.
#[async_trait]
pub trait RequestLogSink: Send + Sync {
    /// Identity used in diagnostics when the sink fails.
    fn name(&self) -> &str;

    /// Prepare the sink before it is registered.
    ///
    /// **Returns**
    /// - `Ok(())` if the sink is ready to receive records.
    /// - `Err(..)` if it cannot work with this configuration; the registry
    ///   then leaves it out.
    ///
    /// Default implementation does nothing.
    fn init(&mut self, _config: &RequestLoggingConfig) -> SinkResult {
        Ok(())
    }

    /// A sampled request has started.
    async fn on_start(&self, record: &LogRecord) -> SinkResult;

    /// A response has been produced.
    async fn on_complete(&self, record: &LogRecord) -> SinkResult;

    /// Serving the request failed.
    ///
    /// `record` carries the exception type, message and, when known, the
    /// stack text.
    async fn on_error(&self, record: &LogRecord) -> SinkResult;

    /// Release resources at shutdown.
    ///
    /// Default implementation is a no-op.
    async fn close(&self) -> SinkResult {
        Ok(())
    }
}

/// Route `event` to the matching sink callback.
pub(crate) async fn deliver(
    sink: &dyn RequestLogSink,
    event: LogEvent,
    record: &LogRecord,
) -> SinkResult {
    match event {
        LogEvent::Start => sink.on_start(record).await,
        LogEvent::Complete => sink.on_complete(record).await,
        LogEvent::Error => sink.on_error(record).await,
    }
}
