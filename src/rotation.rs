//! Selection of the physical file a record is written to.
//!
//! Files live flat in one base directory:
//!
//! ```text
//! data/
//! ├── request-2025-01-14.log      # daily strategy
//! ├── request-2025-01-15.log
//! ├── request-2025-01-15-0.log    # size strategy, first file of the day
//! └── request-2025-01-15-1.log
//! ```
//!
//! Each strategy keeps its cursor (current file, bucket, size sequence)
//! behind one mutex, so deciding to roll over and creating the next file
//! happen as a single step.

use crate::config::{RequestLoggingConfig, StrategyKind};
use crate::record::LogRecord;
use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};

const FILE_PREFIX: &str = "request-";
const FILE_SUFFIX: &str = ".log";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Error type returned by rotation strategies.
#[derive(thiserror::Error, Debug)]
pub enum RotationError {
    #[error("rotation strategy used before init")]
    NotInitialized,

    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Source of "today" for bucket selection.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Calendar date in the system local zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Rotation bucket a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Daily(NaiveDate),
    Sized { date: NaiveDate, seq: u32 },
}

/// Handle to the file currently selected by a strategy.
///
/// The same `Arc<LogFile>` is handed out for as long as the bucket does not
/// change, so `Arc::ptr_eq` tells whether two calls landed on the same file.
#[derive(Debug, PartialEq, Eq)]
pub struct LogFile {
    path: PathBuf,
    bucket: Bucket,
}

impl LogFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }
}

/// Pluggable policy deciding which file a record belongs to.
pub trait RotationStrategy: Send + Sync {
    /// Name used in configuration (`daily`, `size`).
    fn name(&self) -> &'static str;

    /// Bind the strategy to `base_dir`, creating it if missing.
    fn init(&mut self, base_dir: &Path) -> Result<(), RotationError>;

    /// File the given record should be appended to. Rolls over, and then
    /// runs [`cleanup`](Self::cleanup), when the bucket changes.
    fn file_for(&self, record: &LogRecord) -> Result<Arc<LogFile>, RotationError>;

    /// Delete the oldest matching files beyond the retention count.
    /// Failures are logged, never returned.
    fn cleanup(&self);
}

/// Build the strategy named by `log-file-strategy`.
pub fn strategy_from_config(
    config: &RequestLoggingConfig,
    clock: Arc<dyn Clock>,
) -> Box<dyn RotationStrategy> {
    match config.strategy_kind() {
        StrategyKind::Daily => Box::new(DailyRollingStrategy::new(config.max_history, clock)),
        StrategyKind::Size => Box::new(SizeBasedRollingStrategy::new(
            config.max_file_size_bytes(),
            config.max_files,
            clock,
        )),
    }
}

/// One file per calendar day: `request-<date>.log`.
pub struct DailyRollingStrategy {
    max_history: usize,
    clock: Arc<dyn Clock>,
    base_dir: Option<PathBuf>,
    current: Mutex<Option<Arc<LogFile>>>,
}

impl DailyRollingStrategy {
    pub fn new(max_history: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_history,
            clock,
            base_dir: None,
            current: Mutex::new(None),
        }
    }
}

impl RotationStrategy for DailyRollingStrategy {
    fn name(&self) -> &'static str {
        "daily"
    }

    fn init(&mut self, base_dir: &Path) -> Result<(), RotationError> {
        create_dir(base_dir)?;
        self.base_dir = Some(base_dir.to_path_buf());
        Ok(())
    }

    fn file_for(&self, _record: &LogRecord) -> Result<Arc<LogFile>, RotationError> {
        let base_dir = self.base_dir.as_deref().ok_or(RotationError::NotInitialized)?;
        let today = self.clock.today();

        let mut current = self.current.lock();
        if let Some(file) = current.as_ref() {
            if file.bucket == Bucket::Daily(today) {
                return Ok(Arc::clone(file));
            }
        }

        let path = base_dir.join(daily_file_name(today));
        touch(base_dir, &path)?;
        let file = Arc::new(LogFile {
            path,
            bucket: Bucket::Daily(today),
        });
        debug!(path = %file.path.display(), "rolled over to daily request log");
        *current = Some(Arc::clone(&file));

        remove_oldest(base_dir, self.max_history, daily_rank);
        Ok(file)
    }

    fn cleanup(&self) {
        if let Some(base_dir) = &self.base_dir {
            let _guard = self.current.lock();
            remove_oldest(base_dir, self.max_history, daily_rank);
        }
    }
}

/// Numbered files per day, `request-<date>-<seq>.log`, moving to the next
/// sequence once the current file reaches `max_file_size` bytes.
pub struct SizeBasedRollingStrategy {
    max_file_size: u64,
    max_files: usize,
    clock: Arc<dyn Clock>,
    base_dir: Option<PathBuf>,
    current: Mutex<Option<Arc<LogFile>>>,
}

impl SizeBasedRollingStrategy {
    pub fn new(max_file_size: u64, max_files: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_file_size,
            max_files,
            clock,
            base_dir: None,
            current: Mutex::new(None),
        }
    }

    fn open(&self, base_dir: &Path, date: NaiveDate, seq: u32) -> Result<Arc<LogFile>, RotationError> {
        let path = base_dir.join(sized_file_name(date, seq));
        touch(base_dir, &path)?;
        Ok(Arc::new(LogFile {
            path,
            bucket: Bucket::Sized { date, seq },
        }))
    }
}

impl RotationStrategy for SizeBasedRollingStrategy {
    fn name(&self) -> &'static str {
        "size"
    }

    fn init(&mut self, base_dir: &Path) -> Result<(), RotationError> {
        create_dir(base_dir)?;
        self.base_dir = Some(base_dir.to_path_buf());
        Ok(())
    }

    fn file_for(&self, _record: &LogRecord) -> Result<Arc<LogFile>, RotationError> {
        let base_dir = self.base_dir.as_deref().ok_or(RotationError::NotInitialized)?;
        let today = self.clock.today();

        let mut current = self.current.lock();
        let file = match current.as_ref() {
            Some(file) if matches!(file.bucket, Bucket::Sized { date, .. } if date == today) => {
                Arc::clone(file)
            }
            // First use today: resume after the highest sequence already on disk.
            _ => {
                let seq = highest_sequence(base_dir, today).unwrap_or(0);
                let file = self.open(base_dir, today, seq)?;
                debug!(path = %file.path.display(), "switched to sized request log for new day");
                *current = Some(Arc::clone(&file));
                remove_oldest(base_dir, self.max_files, sized_rank);
                file
            }
        };

        let len = fs::metadata(&file.path).map(|m| m.len()).unwrap_or(0);
        if len < self.max_file_size {
            return Ok(file);
        }

        let seq = match file.bucket {
            Bucket::Sized { seq, .. } => seq + 1,
            Bucket::Daily(_) => 0,
        };
        let next = self.open(base_dir, today, seq)?;
        debug!(path = %next.path.display(), "rolled over to next sized request log");
        *current = Some(Arc::clone(&next));

        remove_oldest(base_dir, self.max_files, sized_rank);
        Ok(next)
    }

    fn cleanup(&self) {
        if let Some(base_dir) = &self.base_dir {
            let _guard = self.current.lock();
            remove_oldest(base_dir, self.max_files, sized_rank);
        }
    }
}

pub fn daily_file_name(date: NaiveDate) -> String {
    format!("{FILE_PREFIX}{}{FILE_SUFFIX}", date.format(DATE_FORMAT))
}

pub fn sized_file_name(date: NaiveDate, seq: u32) -> String {
    format!("{FILE_PREFIX}{}-{seq}{FILE_SUFFIX}", date.format(DATE_FORMAT))
}

fn strip_name(name: &str) -> Option<&str> {
    name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)
}

fn parse_daily(name: &str) -> Option<NaiveDate> {
    let stem = strip_name(name)?;
    // Exactly `YYYY-MM-DD`; anything longer is a sized file.
    if stem.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(stem, DATE_FORMAT).ok()
}

fn parse_sized(name: &str) -> Option<(NaiveDate, u32)> {
    let stem = strip_name(name)?;
    let (date, seq) = stem.rsplit_once('-')?;
    if date.len() != 10 || seq.is_empty() || !seq.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?, seq.parse().ok()?))
}

fn daily_rank(name: &str) -> Option<(NaiveDate, u32)> {
    parse_daily(name).map(|date| (date, 0))
}

fn sized_rank(name: &str) -> Option<(NaiveDate, u32)> {
    parse_sized(name)
}

fn highest_sequence(base_dir: &Path, date: NaiveDate) -> Option<u32> {
    fs::read_dir(base_dir)
        .ok()?
        .filter_map(Result::ok)
        .filter_map(|entry| parse_sized(&entry.file_name().to_string_lossy()))
        .filter(|(d, _)| *d == date)
        .map(|(_, seq)| seq)
        .max()
}

fn create_dir(dir: &Path) -> Result<(), RotationError> {
    fs::create_dir_all(dir).map_err(|source| RotationError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Make sure `path` exists so the bucket is claimed before anyone writes.
fn touch(base_dir: &Path, path: &Path) -> Result<(), RotationError> {
    create_dir(base_dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(drop)
        .map_err(|source| RotationError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Keep the `keep` most recently modified files that `rank` recognises.
///
/// A retention of zero is treated as one: the file just selected is never
/// deleted out from under its writers.
fn remove_oldest(base_dir: &Path, keep: usize, rank: fn(&str) -> Option<(NaiveDate, u32)>) {
    let keep = keep.max(1);
    let entries = match fs::read_dir(base_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %base_dir.display(), error = %e, "failed to list request log directory");
            return;
        }
    };

    let mut files: Vec<(SystemTime, (NaiveDate, u32), PathBuf)> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let bucket = rank(&entry.file_name().to_string_lossy())?;
            let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, bucket, entry.path()))
        })
        .collect();

    if files.len() <= keep {
        return;
    }

    // Oldest first. Timestamps are coarse, so the bucket breaks ties.
    files.sort();
    let excess = files.len() - keep;
    for (_, _, path) in files.into_iter().take(excess) {
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed old request log"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to delete old request log"),
        }
    }
}
