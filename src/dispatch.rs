use crate::pool::{PooledRecord, RecordPool};
use crate::record::{LogEvent, LogRecord};
use crate::registry::SinkRegistry;
use crate::sink::{deliver, RequestLogSink};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, warn};

/// How records reach the sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Every sink runs on the caller before `dispatch` returns.
    Sync,
    /// Events are queued to a bounded worker pool. When the queue is full the
    /// event runs on the caller instead (caller-runs backpressure).
    Async { workers: usize, queue_capacity: usize },
}

/// Counters describing dispatch activity.
#[derive(Debug, Default)]
pub struct DispatchStats {
    /// Events handed to `dispatch`.
    pub dispatched: AtomicU64,
    /// Events queued to the worker pool.
    pub enqueued: AtomicU64,
    /// Async events that ran on the caller because the queue was full.
    pub caller_runs: AtomicU64,
    /// Sink calls that returned an error.
    pub sink_failures: AtomicU64,
    /// Sink calls that panicked.
    pub sink_panics: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub dispatched: u64,
    pub enqueued: u64,
    pub caller_runs: u64,
    pub sink_failures: u64,
    pub sink_panics: u64,
}

impl DispatchStats {
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            caller_runs: self.caller_runs.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            sink_panics: self.sink_panics.load(Ordering::Relaxed),
        }
    }
}

struct Task {
    event: LogEvent,
    record: PooledRecord,
}

/// Fans every event out to all registered sinks and returns the record to
/// the pool once the last sink is done with it.
///
/// In async mode ordering holds within one event (sinks still run in
/// registration order) but not across events: with more than one worker the
/// complete or error event of a request may reach the sinks before its start
/// event. A single worker preserves submission order.
pub struct Dispatcher {
    sinks: Arc<SinkRegistry>,
    pool: Arc<RecordPool>,
    stats: Arc<DispatchStats>,
    sender: Option<mpsc::Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Create a dispatcher. In async mode this spawns the workers on the
    /// current Tokio runtime; without one it degrades to sync dispatch.
    pub fn new(sinks: Arc<SinkRegistry>, pool: Arc<RecordPool>, mode: DispatchMode) -> Self {
        let stats = Arc::new(DispatchStats::default());
        let mut dispatcher = Self {
            sinks,
            pool,
            stats,
            sender: None,
            workers: Vec::new(),
        };

        if let DispatchMode::Async { workers, queue_capacity } = mode {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => dispatcher.spawn_workers(&handle, workers.max(1), queue_capacity.max(1)),
                Err(_) => warn!("async request logging needs a Tokio runtime, dispatching synchronously"),
            }
        }
        dispatcher
    }

    fn spawn_workers(&mut self, handle: &tokio::runtime::Handle, workers: usize, capacity: usize) {
        let (tx, rx) = mpsc::channel::<Task>(capacity);
        let rx = Arc::new(Mutex::new(rx));

        for id in 0..workers {
            let rx = Arc::clone(&rx);
            let sinks = Arc::clone(&self.sinks);
            let pool = Arc::clone(&self.pool);
            let stats = Arc::clone(&self.stats);

            self.workers.push(handle.spawn(async move {
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(task) = next else { break };
                    fan_out(sinks.sinks(), task.event, &task.record, &stats).await;
                    pool.release(task.record);
                }
                debug!(worker = id, "request log worker stopped");
            }));
        }
        self.sender = Some(tx);
    }

    pub fn is_async(&self) -> bool {
        self.sender.is_some()
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    pub fn sinks(&self) -> &SinkRegistry {
        &self.sinks
    }

    /// Deliver `record` for `event` to every sink.
    ///
    /// Sync mode returns after all sinks ran. Async mode returns as soon as
    /// the event is queued, or after running it in place when the queue is
    /// full. Either way the record goes back to the pool only after the last
    /// sink saw it. Records that did not come from the pool are dropped
    /// afterwards instead.
    pub async fn dispatch(&self, event: LogEvent, record: impl Into<PooledRecord>) {
        self.stats.dispatched.fetch_add(1, Ordering::Relaxed);
        let record = record.into();

        let Some(sender) = &self.sender else {
            self.run_here(event, record).await;
            return;
        };

        match sender.try_send(Task { event, record }) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(mpsc::error::TrySendError::Full(task)) => {
                self.stats.caller_runs.fetch_add(1, Ordering::Relaxed);
                self.run_here(task.event, task.record).await;
            }
            Err(mpsc::error::TrySendError::Closed(task)) => {
                self.run_here(task.event, task.record).await;
            }
        }
    }

    async fn run_here(&self, event: LogEvent, record: PooledRecord) {
        fan_out(self.sinks.sinks(), event, &record, &self.stats).await;
        self.pool.release(record);
    }

    /// Stop accepting work, wait up to `grace` for queued events to drain,
    /// then close every sink.
    pub async fn shutdown(mut self, grace: Duration) {
        drop(self.sender.take());

        let workers = std::mem::take(&mut self.workers);
        let drained = timeout(grace, futures::future::join_all(workers)).await;
        if drained.is_err() {
            warn!(?grace, "request log workers did not drain in time");
        }

        self.sinks.close_all().await;
    }
}

/// Invoke every sink in order. A failing or panicking sink is logged with its
/// name and counted; the rest still run.
pub(crate) async fn fan_out(
    sinks: &[Arc<dyn RequestLogSink>],
    event: LogEvent,
    record: &LogRecord,
    stats: &DispatchStats,
) {
    for sink in sinks {
        let outcome = AssertUnwindSafe(deliver(sink.as_ref(), event, record))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                stats.sink_failures.fetch_add(1, Ordering::Relaxed);
                warn!(sink = sink.name(), %event, trace_id = %record.trace_id, error = %e, "request log sink failed");
            }
            Err(_) => {
                stats.sink_panics.fetch_add(1, Ordering::Relaxed);
                error!(sink = sink.name(), %event, trace_id = %record.trace_id, "request log sink panicked");
            }
        }
    }
}
