use crate::config::RequestLoggingConfig;
use crate::format::{format_record, FormatOptions};
use crate::record::{LogEvent, LogRecord};
use crate::sink::{RequestLogSink, SinkResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::io::{self, Write};

/// Writes a formatted block per event to stdout, or to any writer handed in.
///
/// Blocks are coloured by phase (start green, complete blue, error red) when
/// `console-color` is on and the crate is built with the `color` feature.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
    format: FormatOptions,
    color: bool,
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    /// Send output to `out` instead of stdout. Colour starts disabled.
    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            format: FormatOptions::default(),
            color: false,
        }
    }

    fn emit(&self, event: LogEvent, record: &LogRecord) -> SinkResult {
        let block = format_record(event, record, &self.format);
        let block = if self.color { paint(event, &block) } else { block };

        let mut out = self.out.lock();
        writeln!(out, "{block}")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(feature = "color")]
fn paint(event: LogEvent, text: &str) -> String {
    use colored::Colorize;

    match event {
        LogEvent::Start => text.green().to_string(),
        LogEvent::Complete => text.blue().to_string(),
        LogEvent::Error => text.red().to_string(),
    }
}

#[cfg(not(feature = "color"))]
fn paint(_event: LogEvent, text: &str) -> String {
    text.to_string()
}

#[async_trait]
impl RequestLogSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn init(&mut self, config: &RequestLoggingConfig) -> SinkResult {
        self.format = FormatOptions::from_config(config);
        self.color = config.console_color;
        Ok(())
    }

    async fn on_start(&self, record: &LogRecord) -> SinkResult {
        self.emit(LogEvent::Start, record)
    }

    async fn on_complete(&self, record: &LogRecord) -> SinkResult {
        self.emit(LogEvent::Complete, record)
    }

    async fn on_error(&self, record: &LogRecord) -> SinkResult {
        self.emit(LogEvent::Error, record)
    }
}
