use std::time::Instant;

use request_log_sink::config::RequestLoggingConfig;
use request_log_sink::http::{RequestInfo, ResponseInfo};
use request_log_sink::init::init_request_logging_with_sinks;
use request_log_sink::noop_sink::NoopSink;

#[tokio::main]
async fn main() {
    let config = RequestLoggingConfig {
        sinks: Vec::new(),
        sampling_rate: 100.0,
        ..Default::default()
    };
    let logger = init_request_logging_with_sinks(config, vec![Box::new(NoopSink)]);

    let n: u64 = 100_000;
    let request = RequestInfo::new("GET", "/orders/42")
        .with_header("User-Agent", "sync-load")
        .with_remote_addr("127.0.0.1");
    let response = ResponseInfo::new(200).with_body(br#"{"id":42}"#.to_vec());

    let start = Instant::now();
    for _ in 0..n {
        let mut ctx = logger.begin(None);
        logger.log_start(&mut ctx, &request).await;
        logger.log_complete(&mut ctx, &request, &response).await;
        logger.finish(ctx);
    }
    let elapsed = start.elapsed();

    let pool = logger.pool().stats().snapshot();
    println!(
        "sync dispatch: {} requests in {:?} (~{:.0} req/s), pool hits {} misses {}",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64(),
        pool.hits,
        pool.misses
    );

    logger.shutdown().await;
}
