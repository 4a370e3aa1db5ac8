//! Parsing of the server probes shown by `autodeploy status`.
//!
//! Inputs are raw stdout; every parser returns `None` rather than failing so
//! a missing tool never breaks the status report.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

static EXPIRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Safety: this is a compile-time constant pattern, cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"Expiry Date:\s*(.+)").expect("valid regex")
});

/// Used/total pair from `free -h` or `df -h`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUsage {
    pub used: String,
    pub total: String,
    pub percent: Option<String>,
}

/// `Mem:  7.7Gi  1.2Gi  5.1Gi ...`
#[must_use]
pub fn parse_memory(line: &str) -> Option<ResourceUsage> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    Some(ResourceUsage {
        total: (*fields.get(1)?).to_string(),
        used: (*fields.get(2)?).to_string(),
        percent: None,
    })
}

/// `/dev/sda1  40G  12G  28G  30% /`
#[must_use]
pub fn parse_disk(line: &str) -> Option<ResourceUsage> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    Some(ResourceUsage {
        total: (*fields.get(1)?).to_string(),
        used: (*fields.get(2)?).to_string(),
        percent: fields.get(4).map(|p| (*p).to_string()),
    })
}

/// Expiry line printed by `certbot certificates`.
#[must_use]
pub fn parse_certificate_expiry(output: &str) -> Option<String> {
    EXPIRY_RE
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// One supervised process as reported by the process manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    pub name: String,
    pub status: String,
    /// Start time in milliseconds since the epoch.
    pub started_at_ms: Option<i64>,
    pub restarts: u64,
    pub memory_bytes: u64,
    pub cpu_percent: f64,
}

impl ProcessInfo {
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}

#[derive(Deserialize)]
struct JlistEntry {
    name: String,
    #[serde(default)]
    pm2_env: JlistEnv,
    #[serde(default)]
    monit: JlistMonit,
}

#[derive(Deserialize, Default)]
struct JlistEnv {
    #[serde(default)]
    status: String,
    #[serde(default)]
    pm_uptime: Option<i64>,
    #[serde(default)]
    restart_time: u64,
}

#[derive(Deserialize, Default)]
struct JlistMonit {
    #[serde(default)]
    memory: u64,
    #[serde(default)]
    cpu: f64,
}

/// Find `name` in `pm2 jlist` output.
///
/// Returns `None` when the output is not a process list or the process is
/// not registered. Banner lines printed before the JSON are skipped.
#[must_use]
pub fn find_process(jlist: &str, name: &str) -> Option<ProcessInfo> {
    let entries = jlist.match_indices('[').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&jlist[start..])
            .into_iter::<Vec<JlistEntry>>()
            .next()
            .and_then(Result::ok)
    })?;
    entries
        .into_iter()
        .find(|e| e.name == name)
        .map(|e| ProcessInfo {
            name: e.name,
            status: e.pm2_env.status,
            started_at_ms: e.pm2_env.pm_uptime,
            restarts: e.pm2_env.restart_time,
            memory_bytes: e.monit.memory,
            cpu_percent: e.monit.cpu,
        })
}

/// `3d 4h`, `4h 12m` or `12m` for an elapsed time in milliseconds.
#[must_use]
pub fn format_uptime(elapsed_ms: i64) -> String {
    let minutes_total = elapsed_ms.max(0) / 60_000;
    let days = minutes_total / (24 * 60);
    let hours = (minutes_total / 60) % 24;
    let minutes = minutes_total % 60;
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Human-readable binary size, e.g. `48.5 MB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}
