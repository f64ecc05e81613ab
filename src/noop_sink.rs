use crate::record::LogRecord;
use crate::sink::{RequestLogSink, SinkResult};
use async_trait::async_trait;

/// A sink that simply drops all records.
///
/// Useful for measuring the overhead of sampling, pooling and dispatch
/// without any I/O, and for tests that don't care about output.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl RequestLogSink for NoopSink {
    fn name(&self) -> &str {
        "noop"
    }

    async fn on_start(&self, _record: &LogRecord) -> SinkResult {
        Ok(())
    }

    async fn on_complete(&self, _record: &LogRecord) -> SinkResult {
        Ok(())
    }

    async fn on_error(&self, _record: &LogRecord) -> SinkResult {
        Ok(())
    }
}
