//! JSON output helpers.
//!
//! Provides the error-object formatter used by all `--json` code paths when
//! a command fails, and `JsonRenderer` for command results.

use anyhow::{Context, Result};
use serde_json::{Value, json};

use crate::application::services::logs::{Excerpt, LogsReport};
use crate::application::services::provision::ProvisionReport;
use crate::application::services::status::{ProcessState, ServerStatus};
use crate::domain::error::{ConfigError, DeployError};
use crate::domain::history::RunRecord;
use crate::domain::status::ResourceUsage;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Machine-readable code for the innermost typed error in `err`'s chain.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<DeployError>() {
            return e.code();
        }
        match cause.downcast_ref::<ConfigError>() {
            Some(ConfigError::NotFound) => return "CONFIG_NOT_FOUND",
            Some(_) => return "CONFIG_INVALID",
            None => {}
        }
    }
    "COMMAND_FAILED"
}

/// Prints command results as pretty JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    fn print(value: &Value) -> Result<()> {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("JSON serialization failed")?
        );
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_run(record: &RunRecord, domain: Option<&str>) -> Result<()> {
        let mut value = serde_json::to_value(record).context("JSON serialization failed")?;
        if let (Some(obj), Some(domain)) = (value.as_object_mut(), domain) {
            obj.insert("url".to_string(), json!(format!("https://{domain}")));
        }
        Self::print(&value)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_provisioned(report: &ProvisionReport, config_path: &str) -> Result<()> {
        Self::print(&json!({
            "completed": report.completed,
            "skipped": report.skipped,
            "ignored": report.ignored,
            "config": config_path,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_status(project: &str, status: &ServerStatus) -> Result<()> {
        let process = status.process.as_ref().map(|p| match p {
            ProcessState::Running(info) => json!({
                "name": info.name,
                "status": info.status,
                "startedAt": info.started_at_ms,
                "restarts": info.restarts,
                "memoryBytes": info.memory_bytes,
                "cpuPercent": info.cpu_percent,
            }),
            ProcessState::NotRegistered => json!({ "status": "not registered" }),
        });
        let domain = status.domain.as_ref().map(|d| {
            json!({
                "domain": d.domain,
                "certificateExpiry": d.certificate_expiry,
            })
        });
        Self::print(&json!({
            "project": project,
            "uptime": status.uptime,
            "memory": status.memory.as_ref().map(usage),
            "disk": status.disk.as_ref().map(usage),
            "branch": status.branch,
            "lastCommit": status.last_commit,
            "process": process,
            "domain": domain,
            "recent": status.recent,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_logs(report: &LogsReport) -> Result<()> {
        Self::print(&json!({
            "deployments": excerpt(&report.deployments),
            "application": excerpt(&report.application),
            "webServer": excerpt(&report.web_server),
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_domain(domain: Option<&str>) -> Result<()> {
        Self::print(&json!({ "domain": domain }))
    }
}

fn usage(u: &ResourceUsage) -> Value {
    json!({ "used": u.used, "total": u.total, "percent": u.percent })
}

fn excerpt(e: &Excerpt) -> Value {
    match e {
        Excerpt::NotApplicable => Value::Null,
        Excerpt::Empty => json!(""),
        Excerpt::Lines(text) => json!(text),
    }
}
