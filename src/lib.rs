pub mod record;
pub mod pool;
pub mod sampling;
pub mod context;
pub mod http;

pub mod config;
pub mod env;

pub mod sink;
pub mod registry;
pub mod dispatch;
pub mod metrics;
pub mod service;
pub mod init;

pub mod format;
pub mod writer;
pub mod rotation;
pub mod console_sink;
pub mod file_sink;
pub mod noop_sink;

pub use config::RequestLoggingConfig;
pub use context::RequestContext;
pub use http::{ErrorInfo, RequestInfo, ResponseInfo};
pub use init::{init_request_logging, init_request_logging_with_sinks, init_tracing};
pub use pool::{PooledRecord, RecordPool};
pub use record::{LogEvent, LogRecord};
pub use registry::SinkRegistry;
pub use service::RequestLogger;
pub use sink::{RequestLogSink, SinkResult};
