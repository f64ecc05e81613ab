use crate::config::RequestLoggingConfig;
use crate::record::{LogEvent, LogRecord};
use chrono::Local;
use std::fmt::Write;

/// Layout options shared by the text sinks.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub separator: String,
    pub start_flag: String,
    pub end_flag: String,
    pub error_flag: String,
    pub show_timestamp: bool,
    pub json_pretty_print: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self::from_config(&RequestLoggingConfig::default())
    }
}

impl FormatOptions {
    pub fn from_config(config: &RequestLoggingConfig) -> Self {
        Self {
            separator: config.separator.clone(),
            start_flag: config.request_start_flag.clone(),
            end_flag: config.request_end_flag.clone(),
            error_flag: config.request_error_flag.clone(),
            show_timestamp: config.show_timestamp,
            json_pretty_print: config.json_pretty_print,
        }
    }

    fn flag(&self, event: LogEvent) -> &str {
        match event {
            LogEvent::Start => &self.start_flag,
            LogEvent::Complete => &self.end_flag,
            LogEvent::Error => &self.error_flag,
        }
    }
}

/// Render one record as a multi-line, human-readable block.
///
/// ```text
/// ===================
/// >>> Request Start >>>
/// Date          : 2025-01-15
/// Time          : 10:30:45.123
/// Trace ID      : 3f0c...
/// Method        : POST
/// ...
/// ===================
/// ```
pub fn format_record(event: LogEvent, record: &LogRecord, opts: &FormatOptions) -> String {
    let mut out = String::with_capacity(512);
    // Writing into a String cannot fail.
    let _ = write_block(&mut out, event, record, opts);
    out
}

fn write_block(
    out: &mut String,
    event: LogEvent,
    record: &LogRecord,
    opts: &FormatOptions,
) -> std::fmt::Result {
    writeln!(out, "{}", opts.separator)?;
    writeln!(out, "{}", opts.flag(event))?;

    if opts.show_timestamp {
        if let Some(ts) = record.request_time {
            let local = ts.with_timezone(&Local);
            writeln!(out, "Date          : {}", local.format("%Y-%m-%d"))?;
            writeln!(out, "Time          : {}", local.format("%H:%M:%S%.3f"))?;
        }
    }

    writeln!(out, "Trace ID      : {}", record.trace_id)?;
    writeln!(out, "Method        : {}", record.method)?;
    writeln!(out, "URI           : {}", record.uri)?;
    if let Some(query) = &record.query_string {
        writeln!(out, "Query String  : {query}")?;
    }
    writeln!(out, "Client IP     : {}", record.client_ip)?;

    if !record.headers.is_empty() {
        writeln!(out, "Headers       :")?;
        for (name, value) in &record.headers {
            writeln!(out, "  {name}: {value}")?;
        }
    }

    if let Some(body) = &record.request_body {
        writeln!(out, "Request Body  :")?;
        writeln!(out, "{}", render_body(body, opts.json_pretty_print))?;
    }

    if let Some(status) = record.status {
        writeln!(out, "Status        : {status}")?;
    }
    if let Some(ms) = record.processing_time_ms() {
        writeln!(out, "Response Time : {ms}ms")?;
    }
    if let Some(body) = &record.response_body {
        writeln!(out, "Response Body :")?;
        writeln!(out, "{}", render_body(body, opts.json_pretty_print))?;
    }

    if let Some(exception) = &record.exception {
        writeln!(out, "Exception     : {exception}")?;
        writeln!(
            out,
            "Message       : {}",
            record.exception_message.as_deref().unwrap_or("")
        )?;
        if let Some(stack) = &record.stack_trace {
            writeln!(out, "Stack Trace   :")?;
            writeln!(out, "{}", stack.trim_end())?;
        }
    }

    if !record.metrics.is_empty() {
        writeln!(out, "System Metrics:")?;
        for (key, value) in &record.metrics {
            writeln!(out, "  {key}: {value}")?;
        }
    }

    write!(out, "{}", opts.separator)
}

/// Re-indent JSON bodies when asked to; anything else is returned verbatim.
pub fn render_body(body: &str, pretty: bool) -> String {
    if !pretty {
        return body.to_string();
    }
    serde_json::from_str::<serde_json::Value>(body)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or_else(|_| body.to_string())
}
