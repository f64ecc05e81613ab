//! Fixed-capacity free-list of reusable [`LogRecord`]s.
//!
//! Borrowing never blocks and never fails: when the free-list is empty (or the
//! pool is disabled) a fresh record is allocated instead. Ownership does the
//! rest. The pool exclusively owns idle records, and a borrowed record belongs
//! to its caller until it is handed back through [`RecordPool::release`].

use crate::record::LogRecord;
use crossbeam::queue::ArrayQueue;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Records holding more than this many bytes in any body buffer are dropped
/// on return instead of being kept alive in the pool.
pub const MAX_RETAINED_BODY_CAPACITY: usize = 64 * 1024;

/// Records with more headers than this are not recycled.
pub const MAX_RETAINED_HEADERS: usize = 256;

/// Counters describing how the pool is being used.
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Borrows served from the free-list.
    pub hits: AtomicU64,
    /// Borrows that had to allocate.
    pub misses: AtomicU64,
    /// Records accepted back into the free-list.
    pub returns: AtomicU64,
    /// Records dropped on return (failed validation, pool full or disabled).
    pub discards: AtomicU64,
}

/// Point-in-time copy of [`PoolStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub returns: u64,
    pub discards: u64,
}

impl PoolStats {
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            discards: self.discards.load(Ordering::Relaxed),
        }
    }
}

/// A [`LogRecord`] together with the identity of the pool allocation it
/// came from. Derefs to the record.
///
/// Records built by hand convert with `From` and carry identity zero; the
/// pool never recycles those.
#[derive(Debug, Default)]
pub struct PooledRecord {
    instance_id: u64,
    record: LogRecord,
}

impl PooledRecord {
    /// Stable across pool round-trips, unique among records minted by the
    /// same pool. Zero for foreign records.
    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    pub fn into_inner(self) -> LogRecord {
        self.record
    }
}

impl From<LogRecord> for PooledRecord {
    fn from(record: LogRecord) -> Self {
        Self {
            instance_id: 0,
            record,
        }
    }
}

impl Deref for PooledRecord {
    type Target = LogRecord;

    fn deref(&self) -> &LogRecord {
        &self.record
    }
}

impl DerefMut for PooledRecord {
    fn deref_mut(&mut self) -> &mut LogRecord {
        &mut self.record
    }
}

pub struct RecordPool {
    idle: ArrayQueue<PooledRecord>,
    enabled: bool,
    next_instance: AtomicU64,
    stats: PoolStats,
}

impl RecordPool {
    /// Create a pool holding at most `max_size` idle records.
    ///
    /// A `max_size` of zero behaves like a disabled pool.
    pub fn new(enabled: bool, max_size: usize) -> Self {
        Self {
            idle: ArrayQueue::new(max_size.max(1)),
            enabled: enabled && max_size > 0,
            next_instance: AtomicU64::new(1),
            stats: PoolStats::default(),
        }
    }

    /// A pool that always allocates and never keeps anything.
    pub fn disabled() -> Self {
        Self::new(false, 0)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Take a reset record, preferring a pooled one.
    pub fn borrow(&self) -> PooledRecord {
        if self.enabled {
            if let Some(record) = self.idle.pop() {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return record;
            }
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        PooledRecord {
            instance_id: self.next_instance.fetch_add(1, Ordering::Relaxed),
            record: LogRecord::default(),
        }
    }

    /// Hand a record back. Invalid records, or any record when the pool is
    /// full or disabled, are dropped silently.
    pub fn release(&self, mut record: PooledRecord) {
        if !self.enabled || !is_recyclable(&record) {
            self.stats.discards.fetch_add(1, Ordering::Relaxed);
            return;
        }

        record.reset();
        match self.idle.push(record) {
            Ok(()) => {
                self.stats.returns.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.stats.discards.fetch_add(1, Ordering::Relaxed);
                debug!("record pool full, dropping returned record");
            }
        }
    }

    /// Number of idle records currently held.
    pub fn available(&self) -> usize {
        self.idle.len()
    }

    pub fn capacity(&self) -> usize {
        self.idle.capacity()
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }
}

fn is_recyclable(record: &PooledRecord) -> bool {
    let body_ok = |body: &Option<String>| {
        body.as_ref()
            .map_or(true, |b| b.capacity() <= MAX_RETAINED_BODY_CAPACITY)
    };

    record.instance_id != 0
        && record.headers.len() <= MAX_RETAINED_HEADERS
        && body_ok(&record.request_body)
        && body_ok(&record.response_body)
        && body_ok(&record.stack_trace)
}
