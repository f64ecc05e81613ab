use crate::env::{env_or, ENVIRONMENT_ENV};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use sysinfo::{Pid, System};

/// Supplies the host/process snapshot attached to every populated record.
///
/// The logger treats the returned map as opaque and copies it into
/// [`LogRecord::metrics`](crate::record::LogRecord::metrics).
pub trait MetricsProvider: Send + Sync {
    fn collect(&self) -> BTreeMap<String, Value>;
}

/// Provider that reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsProvider for NoopMetrics {
    fn collect(&self) -> BTreeMap<String, Value> {
        BTreeMap::new()
    }
}

/// Host figures are refreshed at most this often; records populated in
/// between reuse the last reading.
const HOST_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Instance, host and process figures.
///
/// CPU and memory come from `sysinfo`. CPU load is the usage measured
/// between two refreshes, so the very first snapshot reports `0.0`.
pub struct SystemMetrics {
    instance_id: String,
    host_name: String,
    environment: String,
    started: Instant,
    host: Mutex<HostSampler>,
}

struct HostSampler {
    system: System,
    pid: Option<Pid>,
    refreshed: Option<Instant>,
    reading: HostReading,
}

#[derive(Debug, Clone, Copy, Default)]
struct HostReading {
    cpu_load: f32,
    used_memory: u64,
    total_memory: u64,
    process_memory: Option<u64>,
}

impl HostSampler {
    fn new() -> Self {
        let mut sampler = Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
            refreshed: None,
            reading: HostReading::default(),
        };
        sampler.refresh();
        sampler
    }

    fn refresh(&mut self) {
        self.system.refresh_cpu();
        self.system.refresh_memory();
        let process_memory = self.pid.and_then(|pid| {
            self.system.refresh_process(pid);
            self.system.process(pid).map(|p| p.memory())
        });

        self.reading = HostReading {
            cpu_load: self.system.global_cpu_info().cpu_usage(),
            used_memory: self.system.used_memory(),
            total_memory: self.system.total_memory(),
            process_memory,
        };
        self.refreshed = Some(Instant::now());
    }

    fn reading(&mut self) -> HostReading {
        let stale = self
            .refreshed
            .map_or(true, |at| at.elapsed() >= HOST_REFRESH_INTERVAL);
        if stale {
            self.refresh();
        }
        self.reading
    }
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemMetrics {
    pub fn new() -> Self {
        let host_name = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown-host".to_string());

        Self {
            instance_id: uuid::Uuid::new_v4().to_string(),
            host_name,
            environment: env_or(ENVIRONMENT_ENV, "default"),
            started: Instant::now(),
            host: Mutex::new(HostSampler::new()),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }
}

impl MetricsProvider for SystemMetrics {
    fn collect(&self) -> BTreeMap<String, Value> {
        let mut metrics = BTreeMap::new();
        metrics.insert("instanceId".to_string(), Value::from(self.instance_id.as_str()));
        metrics.insert("hostName".to_string(), Value::from(self.host_name.as_str()));
        metrics.insert("environment".to_string(), Value::from(self.environment.as_str()));
        metrics.insert("processId".to_string(), Value::from(std::process::id()));
        metrics.insert(
            "uptimeSecs".to_string(),
            Value::from(self.started.elapsed().as_secs()),
        );
        if let Ok(n) = std::thread::available_parallelism() {
            metrics.insert("availableProcessors".to_string(), Value::from(n.get()));
        }

        let host = self.host.lock().reading();
        metrics.insert("cpuLoad".to_string(), Value::from(f64::from(host.cpu_load)));
        metrics.insert("usedMemory".to_string(), Value::from(host.used_memory));
        metrics.insert("totalMemory".to_string(), Value::from(host.total_memory));
        if let Some(bytes) = host.process_memory {
            metrics.insert("processMemory".to_string(), Value::from(bytes));
        }
        metrics.insert(
            "systemLoadAverage".to_string(),
            Value::from(System::load_average().one),
        );

        #[cfg(target_os = "linux")]
        {
            if let Some(threads) = linux::thread_count() {
                metrics.insert("threadCount".to_string(), Value::from(threads));
            }
        }

        metrics
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use std::fs;

    /// `Threads` of this process from `/proc/self/status`.
    pub fn thread_count() -> Option<u64> {
        let status = fs::read_to_string("/proc/self/status").ok()?;
        status
            .lines()
            .find_map(|line| line.strip_prefix("Threads:"))
            .and_then(|rest| rest.trim().parse().ok())
    }
}
