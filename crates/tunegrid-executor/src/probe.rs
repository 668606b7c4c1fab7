//! Process memory sampling for before/after measurements.

/// Samples resident memory of the current process.
pub trait MemoryProbe: Send + Sync {
    /// Resident set size in MB, or `None` when it cannot be read.
    fn resident_mb(&self) -> Option<f64>;
}

/// Reads `VmRSS` from `/proc/self/status`. Yields `None` off Linux.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcfsProbe;

impl MemoryProbe for ProcfsProbe {
    fn resident_mb(&self) -> Option<f64> {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        parse_vm_rss_kb(&status).map(|kb| kb as f64 / 1024.0)
    }
}

/// Always reports the same value.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedProbe(pub Option<f64>);

impl MemoryProbe for FixedProbe {
    fn resident_mb(&self) -> Option<f64> {
        self.0
    }
}

fn parse_vm_rss_kb(status: &str) -> Option<u64> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
}
