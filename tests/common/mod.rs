#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use request_log_sink::config::RequestLoggingConfig;
use request_log_sink::record::{LogEvent, LogRecord};
use request_log_sink::sink::{RequestLogSink, SinkResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub type Captured = Arc<Mutex<Vec<(LogEvent, LogRecord)>>>;

/// Keeps a copy of every record it receives.
pub struct RecordingSink {
    name: &'static str,
    seen: Captured,
    delay: Option<Duration>,
    start_delay: Option<Duration>,
}

impl RecordingSink {
    pub fn new(name: &'static str) -> (Self, Captured) {
        let seen = Captured::default();
        let sink = Self {
            name,
            seen: Arc::clone(&seen),
            delay: None,
            start_delay: None,
        };
        (sink, seen)
    }

    /// Every call sleeps for `delay` before recording.
    pub fn slow(name: &'static str, delay: Duration) -> (Self, Captured) {
        let (mut sink, seen) = Self::new(name);
        sink.delay = Some(delay);
        (sink, seen)
    }

    /// Only start events are delayed.
    pub fn slow_start(name: &'static str, delay: Duration) -> (Self, Captured) {
        let (mut sink, seen) = Self::new(name);
        sink.start_delay = Some(delay);
        (sink, seen)
    }

    async fn record(&self, event: LogEvent, record: &LogRecord) -> SinkResult {
        if let (LogEvent::Start, Some(delay)) = (event, self.start_delay) {
            tokio::time::sleep(delay).await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.seen.lock().push((event, record.clone()));
        Ok(())
    }
}

#[async_trait]
impl RequestLogSink for RecordingSink {
    fn name(&self) -> &str {
        self.name
    }

    async fn on_start(&self, record: &LogRecord) -> SinkResult {
        self.record(LogEvent::Start, record).await
    }

    async fn on_complete(&self, record: &LogRecord) -> SinkResult {
        self.record(LogEvent::Complete, record).await
    }

    async fn on_error(&self, record: &LogRecord) -> SinkResult {
        self.record(LogEvent::Error, record).await
    }
}

/// Fails every call, counting them.
pub struct FailingSink {
    pub calls: Arc<AtomicUsize>,
}

impl FailingSink {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }

    fn fail(&self) -> SinkResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err("backend unavailable".into())
    }
}

#[async_trait]
impl RequestLogSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn on_start(&self, _record: &LogRecord) -> SinkResult {
        self.fail()
    }

    async fn on_complete(&self, _record: &LogRecord) -> SinkResult {
        self.fail()
    }

    async fn on_error(&self, _record: &LogRecord) -> SinkResult {
        self.fail()
    }
}

/// Panics on start events.
pub struct PanickingSink;

#[async_trait]
impl RequestLogSink for PanickingSink {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn on_start(&self, _record: &LogRecord) -> SinkResult {
        panic!("sink bug");
    }

    async fn on_complete(&self, _record: &LogRecord) -> SinkResult {
        Ok(())
    }

    async fn on_error(&self, _record: &LogRecord) -> SinkResult {
        Ok(())
    }
}

/// Config with no built-in sinks, everything sampled.
pub fn quiet_config() -> RequestLoggingConfig {
    RequestLoggingConfig {
        sinks: Vec::new(),
        sampling_rate: 100.0,
        ..Default::default()
    }
}

pub fn count(seen: &Captured, event: LogEvent) -> usize {
    seen.lock().iter().filter(|(e, _)| *e == event).count()
}
