use std::fs;

/// Resident set size of this process in kB, if the platform exposes it.
pub fn resident_kb() -> Option<u64> {
    let status = fs::read_to_string("/proc/self/status").ok()?;
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.split_ascii_whitespace().next())
        .and_then(|kb| kb.parse().ok())
}

pub fn log_memory_usage() {
    match resident_kb() {
        Some(kb) => tracing::info!("Memory usage: {} MB resident", kb / 1024),
        None => tracing::debug!("Memory usage unavailable on this platform"),
    }
}
