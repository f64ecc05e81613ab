use std::time::Instant;

use request_log_sink::config::RequestLoggingConfig;
use request_log_sink::http::{RequestInfo, ResponseInfo};
use request_log_sink::init::init_request_logging_with_sinks;
use request_log_sink::noop_sink::NoopSink;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    let config = RequestLoggingConfig {
        sinks: Vec::new(),
        async_logging: true,
        async_workers: 4,
        async_queue_capacity: 1000,
        ..Default::default()
    };
    let logger = init_request_logging_with_sinks(config, vec![Box::new(NoopSink)]);

    let n: u64 = 100_000;
    let request = RequestInfo::new("POST", "/orders")
        .with_header("Content-Type", "application/json")
        .with_body(br#"{"sku":"A-1","qty":3}"#.to_vec());
    let response = ResponseInfo::new(201);

    let start = Instant::now();
    for _ in 0..n {
        let mut ctx = logger.begin(None);
        logger.log_start(&mut ctx, &request).await;
        logger.log_complete(&mut ctx, &request, &response).await;
        logger.finish(ctx);
    }
    let elapsed = start.elapsed();

    let stats = logger.stats();
    println!(
        "async dispatch: {} requests in {:?} (~{:.0} req/s), queued {} caller-runs {}",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64(),
        stats.enqueued,
        stats.caller_runs
    );

    // Drains whatever is still queued.
    logger.shutdown().await;
}
