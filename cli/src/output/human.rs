//! Human-readable terminal renderer.

use chrono::{DateTime, Local, Utc};
use owo_colors::OwoColorize as _;

use crate::application::services::logs::{Excerpt, LogsReport};
use crate::application::services::provision::ProvisionReport;
use crate::application::services::status::{DomainStatus, ProcessState, ServerStatus};
use crate::domain::history::{RunKind, RunRecord, short_commit};
use crate::domain::status::{ResourceUsage, format_bytes, format_uptime};
use crate::output::OutputContext;

/// Renders run results and reports as terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Final line of a successful deploy or rollback.
    pub fn render_run(&self, record: &RunRecord, domain: Option<&str>) {
        if self.ctx.quiet {
            return;
        }
        let commit = short_commit(record.server_commit.as_deref().unwrap_or(&record.commit));
        println!();
        match record.kind {
            RunKind::Deploy => self.ctx.success(&format!(
                "Deployed {} ({})",
                commit.style(self.ctx.styles.commit),
                record.branch.as_deref().unwrap_or("-")
            )),
            RunKind::Rollback => self.ctx.success(&format!(
                "Rolled back to {}",
                commit.style(self.ctx.styles.commit)
            )),
        }
        if let Some(domain) = domain {
            self.ctx.info(&format!("Live at https://{domain}"));
        }
    }

    pub fn render_provisioned(&self, report: &ProvisionReport, config_path: &str) {
        if self.ctx.quiet {
            return;
        }
        println!();
        self.ctx.success(&format!(
            "Server ready ({} steps, {} already done)",
            report.completed, report.skipped
        ));
        if report.ignored > 0 {
            self.ctx.warn(&format!(
                "{} optional steps failed; see the warnings above",
                report.ignored
            ));
        }
        self.ctx.info(&format!("Configuration saved to {config_path}"));
        self.ctx.header("Next steps");
        println!("    autodeploy deploy    push and deploy the current branch");
        println!("    autodeploy status    check the server");
        println!("    autodeploy domain    attach a domain with HTTPS");
    }

    /// Render the server status snapshot.
    pub fn render_status(&self, project: &str, status: &ServerStatus) {
        self.ctx.header(&format!("Server status: {project}"));
        self.ctx.kv("Uptime", status.uptime.as_deref().unwrap_or("unknown"));
        self.ctx.kv("Memory", &usage(status.memory.as_ref()));
        self.ctx.kv("Disk", &usage(status.disk.as_ref()));

        self.ctx.header("Repository");
        self.ctx.kv("Branch", status.branch.as_deref().unwrap_or("unknown"));
        self.ctx.kv("Last commit", status.last_commit.as_deref().unwrap_or("unknown"));

        if let Some(process) = &status.process {
            self.ctx.header("Application");
            self.render_process(process);
        }

        if let Some(domain) = &status.domain {
            self.ctx.header("Domain");
            self.render_domain_status(domain);
        }

        self.ctx.header("Recent deployments");
        if status.recent.is_empty() {
            self.ctx.kv("", "none yet");
        }
        for record in &status.recent {
            self.render_record(record);
        }
    }

    fn render_process(&self, process: &ProcessState) {
        match process {
            ProcessState::Running(info) => {
                let styled = info.status.style(self.ctx.styles.status(info.is_online()));
                self.ctx.kv("Status", &styled.to_string());
                if let Some(started) = info.started_at_ms {
                    let elapsed = Utc::now().timestamp_millis() - started;
                    self.ctx.kv("Uptime", &format_uptime(elapsed));
                }
                self.ctx.kv("Restarts", &info.restarts.to_string());
                self.ctx.kv("Memory", &format_bytes(info.memory_bytes));
                self.ctx.kv("CPU", &format!("{:.1}%", info.cpu_percent));
            }
            ProcessState::NotRegistered => self.ctx.warn("Process is not registered"),
        }
    }

    fn render_domain_status(&self, domain: &DomainStatus) {
        self.ctx.kv("Domain", &format!("https://{}", domain.domain));
        match &domain.certificate_expiry {
            Some(expiry) => self.ctx.kv("Certificate", &format!("valid until {expiry}")),
            None => self.ctx.warn("No certificate found"),
        }
    }

    fn render_record(&self, record: &RunRecord) {
        if self.ctx.quiet {
            return;
        }
        let ok = record.is_success();
        let mark = if ok { "✓" } else { "✗" };
        let summary = record
            .message
            .as_deref()
            .and_then(|m| m.lines().next())
            .unwrap_or_default();
        println!(
            "    {} {} {} {}",
            mark.style(self.ctx.styles.status(ok)),
            short_commit(&record.commit).style(self.ctx.styles.commit),
            local_time(record.timestamp).style(self.ctx.styles.dim),
            summary
        );
        if let Some(error) = &record.error {
            let first = error.lines().next().unwrap_or_default();
            println!("        {}", first.style(self.ctx.styles.error));
        }
    }

    pub fn render_logs(&self, report: &LogsReport) {
        self.render_excerpt("Deployment log", &report.deployments);
        self.render_excerpt("Application log", &report.application);
        self.render_excerpt("Nginx error log", &report.web_server);
    }

    fn render_excerpt(&self, title: &str, excerpt: &Excerpt) {
        match excerpt {
            Excerpt::NotApplicable => {}
            Excerpt::Empty => {
                self.ctx.header(title);
                self.ctx.kv("", "(empty)");
            }
            Excerpt::Lines(text) => {
                self.ctx.header(title);
                if !self.ctx.quiet {
                    for line in text.lines() {
                        println!("    {line}");
                    }
                }
            }
        }
    }

    pub fn render_domain(&self, domain: Option<&str>) {
        match domain {
            Some(domain) => self.ctx.kv("Domain", &format!("https://{domain}")),
            None => self.ctx.info("No domain configured. Add one: autodeploy domain --add <domain>"),
        }
    }
}

fn usage(usage: Option<&ResourceUsage>) -> String {
    match usage {
        Some(ResourceUsage {
            used,
            total,
            percent: Some(percent),
        }) => format!("{used} / {total} ({percent})"),
        Some(ResourceUsage { used, total, .. }) => format!("{used} / {total}"),
        None => "unknown".to_string(),
    }
}

/// Timestamps are stored in UTC and shown in local time.
#[must_use]
pub fn local_time(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}
