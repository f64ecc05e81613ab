use crate::config::RequestLoggingConfig;
use crate::context::RequestContext;
use crate::dispatch::{DispatchMode, DispatchSnapshot, Dispatcher};
use crate::http::{ErrorInfo, RequestInfo, ResponseInfo};
use crate::metrics::{MetricsProvider, SystemMetrics};
use crate::pool::RecordPool;
use crate::record::{truncate_body, LogEvent, LogRecord};
use crate::registry::SinkRegistry;
use crate::sampling::SamplingGate;
use chrono::Utc;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::debug;

/// Value put in place of excluded header values.
pub const MASKED_VALUE: &str = "******";

/// Entry point used by the HTTP integration layer.
///
/// A typical request goes through:
///
/// ```ignore
/// let mut ctx = logger.begin(request.header("X-Trace-Id"));
/// logger.log_start(&mut ctx, &request).await;
/// match handler(&request).await {
///     Ok(response) => logger.log_complete(&mut ctx, &request, &response).await,
///     Err(e) => logger.log_error(&mut ctx, &request, None, &ErrorInfo::from_error(&e)).await,
/// }
/// logger.finish(ctx);
/// ```
///
/// None of these calls fail or panic: logging problems stay inside the logger.
pub struct RequestLogger {
    config: Arc<RequestLoggingConfig>,
    gate: SamplingGate,
    pool: Arc<RecordPool>,
    metrics: Arc<dyn MetricsProvider>,
    dispatcher: Dispatcher,
}

impl RequestLogger {
    /// Build a logger over `sinks`, reporting [`SystemMetrics`].
    ///
    /// With `async-logging` on this must run inside a Tokio runtime, which
    /// hosts the worker pool.
    pub fn new(config: RequestLoggingConfig, sinks: SinkRegistry) -> Self {
        Self::with_metrics(config, sinks, Arc::new(SystemMetrics::new()))
    }

    pub fn with_metrics(
        config: RequestLoggingConfig,
        sinks: SinkRegistry,
        metrics: Arc<dyn MetricsProvider>,
    ) -> Self {
        let pool = Arc::new(RecordPool::new(
            config.object_pool_enabled,
            config.pool_max_size,
        ));
        let mode = if config.async_logging {
            DispatchMode::Async {
                workers: config.async_workers,
                queue_capacity: config.async_queue_capacity,
            }
        } else {
            DispatchMode::Sync
        };
        let dispatcher = Dispatcher::new(Arc::new(sinks), Arc::clone(&pool), mode);

        Self {
            gate: SamplingGate::new(config.sampling_rate),
            config: Arc::new(config),
            pool,
            metrics,
            dispatcher,
        }
    }

    pub fn config(&self) -> &RequestLoggingConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<RecordPool> {
        &self.pool
    }

    pub fn sinks(&self) -> &SinkRegistry {
        self.dispatcher.sinks()
    }

    pub fn stats(&self) -> DispatchSnapshot {
        self.dispatcher.stats().snapshot()
    }

    /// Open the context for a new logical request and draw its sampling
    /// decision. `incoming_trace_id` (typically the `trace-id-header` value)
    /// is reused when present, otherwise a fresh UUID is minted.
    pub fn begin(&self, incoming_trace_id: Option<&str>) -> RequestContext {
        let trace_id = incoming_trace_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let sampled = self.config.enabled && self.gate.should_process();
        RequestContext::new(trace_id, sampled)
    }

    /// Like [`begin`](Self::begin) but reads the trace id header from the
    /// request and skips excluded paths.
    pub fn begin_request(&self, request: &RequestInfo) -> RequestContext {
        let mut ctx = self.begin(request.header(&self.config.trace_id_header));
        if self.config.is_excluded_path(&request.uri) {
            ctx = RequestContext::new(ctx.trace_id().to_string(), false);
        }
        ctx
    }

    pub async fn log_start(&self, ctx: &mut RequestContext, request: &RequestInfo) {
        if !self.admit(ctx, LogEvent::Start) {
            return;
        }
        let mut record = self.pool.borrow();
        self.fill_request(&mut record, ctx, request);
        if self.config.log_request_body && !request.body.is_empty() {
            record.request_body = Some(truncate_body(
                &String::from_utf8_lossy(&request.body),
                self.config.request_body_max_length,
            ));
        }
        self.dispatcher.dispatch(LogEvent::Start, record).await;
    }

    pub async fn log_complete(
        &self,
        ctx: &mut RequestContext,
        request: &RequestInfo,
        response: &ResponseInfo,
    ) {
        if !self.admit(ctx, LogEvent::Complete) {
            return;
        }
        let mut record = self.pool.borrow();
        self.fill_request(&mut record, ctx, request);
        self.fill_response(&mut record, Some(response));
        self.dispatcher.dispatch(LogEvent::Complete, record).await;
    }

    /// Record a failure. Ignored for requests whose start was not logged.
    pub async fn log_error(
        &self,
        ctx: &mut RequestContext,
        request: &RequestInfo,
        response: Option<&ResponseInfo>,
        error: &ErrorInfo,
    ) {
        if !self.admit(ctx, LogEvent::Error) {
            return;
        }
        let mut record = self.pool.borrow();
        self.fill_request(&mut record, ctx, request);
        self.fill_response(&mut record, response);
        record.exception = Some(error.type_name.clone());
        record.exception_message = Some(error.message.clone());
        record.stack_trace = error.stack.clone();
        self.dispatcher.dispatch(LogEvent::Error, record).await;
    }

    /// End the logical request.
    pub fn finish(&self, mut ctx: RequestContext) {
        ctx.release();
    }

    /// Drain queued events and close all sinks.
    pub async fn shutdown(self) {
        let grace = Duration::from_secs(self.config.shutdown_timeout_secs);
        self.dispatcher.shutdown(grace).await;
    }

    fn admit(&self, ctx: &mut RequestContext, event: LogEvent) -> bool {
        if !ctx.is_sampled() {
            return false;
        }
        if !ctx.advance(event) {
            debug!(trace_id = ctx.trace_id(), phase = ?ctx.phase(), %event, "ignoring out-of-order request log event");
            return false;
        }
        true
    }

    fn fill_request(&self, record: &mut LogRecord, ctx: &RequestContext, request: &RequestInfo) {
        record.trace_id.push_str(ctx.trace_id());
        record.request_time = Some(ctx.request_time());
        record.method.push_str(&request.method);
        record.uri.push_str(&request.uri);
        record.query_string = request.query.clone();
        record.client_ip = request.client_ip();

        if self.config.log_headers {
            for (name, value) in &request.headers {
                let value = if self.config.is_excluded_header(name) {
                    MASKED_VALUE.to_string()
                } else {
                    value.clone()
                };
                record.headers.insert(name.clone(), value);
            }
        }

        record.metrics = self.metrics.collect();
    }

    fn fill_response(&self, record: &mut LogRecord, response: Option<&ResponseInfo>) {
        record.response_time = Some(Utc::now());
        let Some(response) = response else { return };

        if self.config.log_response {
            record.status = Some(response.status);
            if !response.body.is_empty() {
                record.response_body = Some(truncate_body(
                    &String::from_utf8_lossy(&response.body),
                    self.config.response_max_length,
                ));
            }
        }
    }
}
