//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use anyhow::Result;
use console::Term;
use owo_colors::OwoColorize as _;
pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use reporter::TerminalReporter;
pub use styles::Styles;

use crate::application::services::logs::LogsReport;
use crate::application::services::provision::ProvisionReport;
use crate::application::services::status::ServerStatus;
use crate::domain::history::RunRecord;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!();
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("    {:<14} {value}", key.style(self.styles.dim));
        }
    }
}

/// Renders command results in the mode selected by `--json`.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl Renderer<'_> {
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn run(&self, record: &RunRecord, domain: Option<&str>) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_run(record, domain);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_run(record, domain),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn provisioned(&self, report: &ProvisionReport, config_path: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_provisioned(report, config_path);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_provisioned(report, config_path),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn status(&self, project: &str, status: &ServerStatus) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_status(project, status);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_status(project, status),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn logs(&self, report: &LogsReport) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_logs(report);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_logs(report),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn domain(&self, domain: Option<&str>) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_domain(domain);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_domain(domain),
        }
    }
}
