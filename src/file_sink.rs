use crate::config::RequestLoggingConfig;
use crate::format::{format_record, FormatOptions};
use crate::record::{LogEvent, LogRecord};
use crate::rotation::{strategy_from_config, RotationStrategy, SystemClock};
use crate::sink::{RequestLogSink, SinkResult};
use crate::writer::FileWriter;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Appends formatted records to rotating files under `log-file-base-dir`.
///
/// The rotation strategy picks the file and the [`FileWriter`] appends under
/// an advisory lock, both on Tokio's blocking pool. I/O failures are logged and the
/// write is abandoned; they are not reported as sink failures.
pub struct FileSink {
    strategy: Option<Arc<dyn RotationStrategy>>,
    pending: Option<Box<dyn RotationStrategy>>,
    base_dir: Option<PathBuf>,
    writer: FileWriter,
    format: FormatOptions,
}

impl Default for FileSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSink {
    /// Sink whose strategy and directory come from the config passed to `init`.
    pub fn new() -> Self {
        Self {
            strategy: None,
            pending: None,
            base_dir: None,
            writer: FileWriter::new(),
            format: FormatOptions::default(),
        }
    }

    /// Use `strategy` instead of the configured one. It is still bound to the
    /// configured base directory during `init`.
    pub fn with_strategy(strategy: Box<dyn RotationStrategy>) -> Self {
        Self {
            pending: Some(strategy),
            ..Self::new()
        }
    }

    /// Directory the sink writes into, once initialised.
    pub fn base_dir(&self) -> Option<&std::path::Path> {
        self.base_dir.as_deref()
    }

    async fn write(&self, event: LogEvent, record: &LogRecord) -> SinkResult {
        let strategy = Arc::clone(
            self.strategy
                .as_ref()
                .ok_or("file sink used before init")?,
        );

        let content = format_record(event, record, &self.format);
        let record = record.clone();
        let writer = self.writer;
        // Rollover and the append both touch the filesystem, so neither runs
        // on a runtime worker. The writer logs its own failures.
        let written = tokio::task::spawn_blocking(move || match strategy.file_for(&record) {
            Ok(file) => {
                let _ = writer.append(file.path(), &content);
            }
            Err(e) => warn!(error = %e, "no request log file available, dropping record"),
        })
        .await;
        if let Err(e) = written {
            warn!(error = %e, "request log write task failed");
        }
        Ok(())
    }
}

#[async_trait]
impl RequestLogSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn init(&mut self, config: &RequestLoggingConfig) -> SinkResult {
        let mut strategy = self
            .pending
            .take()
            .unwrap_or_else(|| strategy_from_config(config, Arc::new(SystemClock)));
        strategy.init(&config.log_file_base_dir)?;

        self.strategy = Some(Arc::from(strategy));
        self.base_dir = Some(config.log_file_base_dir.clone());
        self.format = FormatOptions::from_config(config);
        Ok(())
    }

    async fn on_start(&self, record: &LogRecord) -> SinkResult {
        self.write(LogEvent::Start, record).await
    }

    async fn on_complete(&self, record: &LogRecord) -> SinkResult {
        self.write(LogEvent::Complete, record).await
    }

    async fn on_error(&self, record: &LogRecord) -> SinkResult {
        self.write(LogEvent::Error, record).await
    }

    async fn close(&self) -> SinkResult {
        if let Some(strategy) = &self.strategy {
            let strategy = Arc::clone(strategy);
            tokio::task::spawn_blocking(move || strategy.cleanup()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::{DailyRollingStrategy, LogFile, RotationError};
    use std::fs;
    use std::path::Path;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn record(trace_id: &str) -> LogRecord {
        LogRecord {
            trace_id: trace_id.into(),
            method: "GET".into(),
            uri: "/orders".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn appends_blocks_to_daily_file() {
        let dir = TempDir::new().unwrap();
        let config = RequestLoggingConfig {
            log_file_base_dir: dir.path().join("logs"),
            ..Default::default()
        };
        let mut sink = FileSink::new();
        sink.init(&config).unwrap();

        sink.on_start(&record("t-1")).await.unwrap();
        sink.on_complete(&record("t-1")).await.unwrap();

        let files: Vec<_> = fs::read_dir(dir.path().join("logs"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("request-") && name.ends_with(".log"));

        let text = fs::read_to_string(&files[0]).unwrap();
        assert_eq!(text.matches("Trace ID      : t-1").count(), 2);
        assert!(text.contains(">>> Request Start >>>"));
        assert!(text.contains("<<< Request End <<<"));
    }

    /// Daily strategy that stalls before every file lookup.
    struct StallingStrategy(DailyRollingStrategy);

    impl RotationStrategy for StallingStrategy {
        fn name(&self) -> &'static str {
            "stalling"
        }

        fn init(&mut self, base_dir: &Path) -> Result<(), RotationError> {
            self.0.init(base_dir)
        }

        fn file_for(&self, record: &LogRecord) -> Result<Arc<LogFile>, RotationError> {
            std::thread::sleep(Duration::from_millis(300));
            self.0.file_for(record)
        }

        fn cleanup(&self) {
            self.0.cleanup()
        }
    }

    #[tokio::test]
    async fn slow_rotation_does_not_stall_the_runtime() {
        let dir = TempDir::new().unwrap();
        let config = RequestLoggingConfig {
            log_file_base_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let mut sink = FileSink::with_strategy(Box::new(StallingStrategy(
            DailyRollingStrategy::new(30, Arc::new(SystemClock)),
        )));
        sink.init(&config).unwrap();

        // Single-threaded runtime: the ticker only finishes early if the
        // file lookup happens off this thread.
        let began = Instant::now();
        let ticker = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            began.elapsed()
        };
        let rec = record("t-1");
        let (written, ticked) = tokio::join!(sink.on_start(&rec), ticker);

        written.unwrap();
        assert!(ticked < Duration::from_millis(200), "ticker took {ticked:?}");
        assert!(began.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn uninitialised_sink_reports_error() {
        let sink = FileSink::new();
        assert!(sink.on_start(&record("t-1")).await.is_err());
    }
}
