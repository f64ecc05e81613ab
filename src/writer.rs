use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::warn;

/// How long [`FileWriter::append`] keeps retrying a contended lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(500);

const LOCK_RETRY_DELAY: Duration = Duration::from_millis(1);

/// Error returned by [`FileWriter::append`]. It has already been logged.
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    #[error("timed out after {timeout:?} waiting for lock on {path}")]
    LockTimeout { path: PathBuf, timeout: Duration },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Appends whole records to a file shared with other threads and processes.
///
/// Every call opens the file in append mode, takes an advisory exclusive
/// lock, writes the content and a line terminator in one `write_all`, then
/// unlocks. Lock attempts are
/// non-blocking and retried until the timeout runs out.
#[derive(Debug, Clone, Copy)]
pub struct FileWriter {
    lock_timeout: Duration,
}

impl Default for FileWriter {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl FileWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self { lock_timeout }
    }

    /// Append `content` plus `\n` to `path`, creating parent directories
    /// as needed.
    ///
    /// **Returns**
    /// - `Ok(())` once the bytes are written.
    /// - `Err(..)` if the lock could not be taken in time or any I/O step
    ///   failed. The failure is logged before returning, so callers on a
    ///   request path are free to ignore it.
    pub fn append(&self, path: &Path, content: &str) -> Result<(), WriteError> {
        let result = self.try_append(path, content);
        if let Err(e) = &result {
            warn!(path = %path.display(), error = %e, "request log write abandoned");
        }
        result
    }

    fn try_append(&self, path: &Path, content: &str) -> Result<(), WriteError> {
        let io_err = |source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;

        self.lock(&file, path)?;

        let mut line = String::with_capacity(content.len() + 1);
        line.push_str(content);
        line.push('\n');

        let written = file.write_all(line.as_bytes()).and_then(|_| file.flush());
        let _ = FileExt::unlock(&file);
        written.map_err(io_err)
    }

    fn lock(&self, file: &File, path: &Path) -> Result<(), WriteError> {
        let deadline = Instant::now() + self.lock_timeout;
        loop {
            match FileExt::try_lock_exclusive(file) {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    if Instant::now() >= deadline {
                        return Err(WriteError::LockTimeout {
                            path: path.to_path_buf(),
                            timeout: self.lock_timeout,
                        });
                    }
                    thread::sleep(LOCK_RETRY_DELAY);
                }
                Err(source) => {
                    return Err(WriteError::Io {
                        path: path.to_path_buf(),
                        source,
                    })
                }
            }
        }
    }
}
