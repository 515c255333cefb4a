//! Read-only system diagnostics for `GET /health`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub system: SystemInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub cpu_cores: usize,
    pub total_memory_mb: u64,
    pub available_memory_mb: u64,
    pub used_memory_mb: u64,
    pub load_average_1m: f64,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub memory_mb: u64,
    pub cpu_usage: f32,
    pub run_time_secs: u64,
}

/// Snapshot CPU, memory and process figures. Blocking; call off the runtime.
pub fn collect() -> HealthReport {
    let sys = sysinfo::System::new_all();

    let system = SystemInfo {
        cpu_cores: num_cpus::get(),
        total_memory_mb: sys.total_memory() / 1024 / 1024,
        available_memory_mb: sys.available_memory() / 1024 / 1024,
        used_memory_mb: sys.used_memory() / 1024 / 1024,
        load_average_1m: sysinfo::System::load_average().one,
        uptime_secs: sysinfo::System::uptime(),
        host_name: sysinfo::System::host_name(),
        os_version: sysinfo::System::long_os_version(),
    };

    let process = sysinfo::get_current_pid()
        .ok()
        .and_then(|pid| sys.process(pid).map(|p| (pid, p)))
        .map(|(pid, p)| ProcessInfo {
            pid: pid.as_u32(),
            memory_mb: p.memory() / 1024 / 1024,
            cpu_usage: p.cpu_usage(),
            run_time_secs: p.run_time(),
        });

    debug!(
        "Health snapshot: {} cores, {} MB available",
        system.cpu_cores, system.available_memory_mb
    );

    HealthReport {
        status: "ok",
        timestamp: Utc::now(),
        system,
        process,
    }
}
