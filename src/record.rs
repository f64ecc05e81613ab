use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Phase of a logical request that a [`LogRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEvent {
    Start,
    Complete,
    Error,
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogEvent::Start => "start",
            LogEvent::Complete => "complete",
            LogEvent::Error => "error",
        };
        f.write_str(name)
    }
}

/// One logical event (request start, completion or error) handed to every sink.
///
/// Records are normally borrowed from a [`RecordPool`](crate::pool::RecordPool)
/// (wrapped in a [`PooledRecord`](crate::pool::PooledRecord)), populated by the [`RequestLogger`](crate::service::RequestLogger) and returned
/// once every sink has seen them. Sinks only ever get a shared reference and must
/// clone whatever they want to keep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogRecord {
    pub trace_id: String,
    pub request_time: Option<DateTime<Utc>>,
    pub response_time: Option<DateTime<Utc>>,
    pub method: String,
    pub uri: String,
    pub query_string: Option<String>,
    pub client_ip: String,
    pub headers: BTreeMap<String, String>,
    pub request_body: Option<String>,
    pub response_body: Option<String>,
    pub status: Option<u16>,
    pub exception: Option<String>,
    pub exception_message: Option<String>,
    pub stack_trace: Option<String>,
    pub metrics: BTreeMap<String, serde_json::Value>,
}

impl LogRecord {
    /// Milliseconds between request and response time, once both are set.
    pub fn processing_time_ms(&self) -> Option<i64> {
        match (self.request_time, self.response_time) {
            (Some(req), Some(resp)) => Some((resp - req).num_milliseconds()),
            _ => None,
        }
    }

    /// Clear every field while keeping allocated capacity for reuse.
    pub fn reset(&mut self) {
        self.trace_id.clear();
        self.request_time = None;
        self.response_time = None;
        self.method.clear();
        self.uri.clear();
        self.query_string = None;
        self.client_ip.clear();
        self.headers.clear();
        self.request_body = None;
        self.response_body = None;
        self.status = None;
        self.exception = None;
        self.exception_message = None;
        self.stack_trace = None;
        self.metrics.clear();
    }
}

/// Cut `body` down to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_body(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            let mut out = String::with_capacity(byte_idx + 3);
            out.push_str(&body[..byte_idx]);
            out.push_str("...");
            out
        }
        None => body.to_string(),
    }
}
