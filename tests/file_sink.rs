use request_log_sink::http::{RequestInfo, ResponseInfo};
use request_log_sink::init::init_request_logging;
use request_log_sink::RequestLoggingConfig;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn log_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("request-") && n.ends_with(".log"))
        .collect();
    names.sort();
    names
}

fn sequence(name: &str) -> u32 {
    let stem = name.trim_end_matches(".log");
    stem.rsplit_once('-').unwrap().1.parse().unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn size_rotation_keeps_newest_files() {
    let dir = TempDir::new().unwrap();
    let config = RequestLoggingConfig {
        sinks: vec!["file".into()],
        log_file_base_dir: dir.path().to_path_buf(),
        log_file_strategy: "size".into(),
        max_file_size: "1KB".into(),
        max_files: 3,
        ..Default::default()
    };
    let logger = init_request_logging(config);
    assert_eq!(logger.sinks().names(), vec!["file"]);

    let body = "x".repeat(200);
    for i in 0..40 {
        let request = RequestInfo::new("POST", "/upload").with_body(body.clone().into_bytes());
        let mut ctx = logger.begin(Some(&format!("req-{i}")));
        logger.log_start(&mut ctx, &request).await;
        logger
            .log_complete(&mut ctx, &request, &ResponseInfo::new(200))
            .await;
        logger.finish(ctx);
    }
    logger.shutdown().await;

    let files = log_files(dir.path());
    assert!(files.len() >= 2 && files.len() <= 3, "{files:?}");

    let newest = files.iter().max_by_key(|n| sequence(n)).unwrap();
    assert!(sequence(newest) >= 3);
    let text = fs::read_to_string(dir.path().join(newest)).unwrap();
    assert!(text.contains("Trace ID      : req-39"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_async_writes_stay_whole() {
    let dir = TempDir::new().unwrap();
    let config = RequestLoggingConfig {
        sinks: vec!["file".into()],
        log_file_base_dir: dir.path().join("nested").join("logs"),
        async_logging: true,
        async_workers: 4,
        ..Default::default()
    };
    let logger = init_request_logging(config);

    for i in 0..100 {
        let request = RequestInfo::new("GET", "/orders").with_query(format!("page={i}"));
        let mut ctx = logger.begin(Some(&format!("req-{i}")));
        logger.log_start(&mut ctx, &request).await;
        logger
            .log_complete(&mut ctx, &request, &ResponseInfo::new(200))
            .await;
        logger.finish(ctx);
    }
    logger.shutdown().await;

    let logs = dir.path().join("nested").join("logs");
    let files = log_files(&logs);
    assert_eq!(files.len(), 1, "{files:?}");

    let text = fs::read_to_string(logs.join(&files[0])).unwrap();
    assert_eq!(text.matches(">>> Request Start >>>").count(), 100);
    assert_eq!(text.matches("<<< Request End <<<").count(), 100);
    assert_eq!(text.matches("Trace ID      : ").count(), 200);

    // Every block is contiguous: its trace id line sits right between the
    // flag/timestamp header and the method line.
    for block in text.split(">>> Request Start >>>").skip(1) {
        let trace = block.find("Trace ID").unwrap();
        let method = block.find("Method").unwrap();
        assert!(trace < method);
    }
}
