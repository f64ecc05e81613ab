use async_trait::async_trait;
use request_log_sink::{
    config::RequestLoggingConfig,
    http::{ErrorInfo, RequestInfo, ResponseInfo},
    init::{init_request_logging_with_sinks, init_tracing},
    record::LogRecord,
    sink::{RequestLogSink, SinkResult},
};

/// Example of plugging in a completely custom destination by implementing
/// `RequestLogSink` directly. Imagine this talks to some proprietary store
/// for which this crate does not provide a built-in sink.
struct MyAuditSink;

#[async_trait]
impl RequestLogSink for MyAuditSink {
    fn name(&self) -> &str {
        "my-audit"
    }

    async fn on_start(&self, record: &LogRecord) -> SinkResult {
        println!("[my-audit] start {} {} {}", record.trace_id, record.method, record.uri);
        Ok(())
    }

    async fn on_complete(&self, record: &LogRecord) -> SinkResult {
        println!(
            "[my-audit] done {} status={:?} took={:?}ms",
            record.trace_id,
            record.status,
            record.processing_time_ms()
        );
        Ok(())
    }

    async fn on_error(&self, record: &LogRecord) -> SinkResult {
        // Serialize the whole record, as a real client library would.
        println!("[my-audit] error {}", serde_json::to_string(record)?);
        Ok(())
    }
}

#[derive(Debug)]
struct OutOfStock;

impl std::fmt::Display for OutOfStock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("sku A-1 is out of stock")
    }
}

impl std::error::Error for OutOfStock {}

#[tokio::main]
async fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("tracing not installed: {e}");
    }

    let config = RequestLoggingConfig {
        sinks: vec!["console".into()],
        ..Default::default()
    };
    let logger = init_request_logging_with_sinks(config, vec![Box::new(MyAuditSink)]);

    let request = RequestInfo::new("POST", "/orders")
        .with_header("X-Trace-Id", "demo-trace")
        .with_header("Authorization", "Bearer secret")
        .with_body(br#"{"sku":"A-1"}"#.to_vec());

    let mut ctx = logger.begin_request(&request);
    logger.log_start(&mut ctx, &request).await;
    logger
        .log_complete(&mut ctx, &request, &ResponseInfo::new(200))
        .await;
    logger.finish(ctx);

    let mut ctx = logger.begin_request(&request);
    logger.log_start(&mut ctx, &request).await;
    logger
        .log_error(
            &mut ctx,
            &request,
            Some(&ResponseInfo::new(409)),
            &ErrorInfo::from_error(&OutOfStock),
        )
        .await;
    logger.finish(ctx);

    logger.shutdown().await;
}
