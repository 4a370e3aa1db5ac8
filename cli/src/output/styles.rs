//! Output styles using the owo-colors stylesheet pattern.

use owo_colors::Style;

/// Colors for terminal output. Every style is plain until [`Styles::colorize`]
/// runs, so `--no-color` and non-TTY output need no special casing.
#[derive(Default, Clone)]
pub struct Styles {
    /// Completed steps, online processes
    pub success: Style,
    /// Ignored failures, expiring certificates
    pub warning: Style,
    /// Failed steps and runs
    pub error: Style,
    pub info: Style,
    /// Labels and timestamps
    pub dim: Style,
    pub bold: Style,
    /// Section titles
    pub header: Style,
    /// Commit hashes and branch names
    pub commit: Style,
}

impl Styles {
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.info = Style::new().blue();
        self.dim = Style::new().dimmed();
        self.bold = Style::new().bold();
        self.header = Style::new().bold().cyan();
        self.commit = Style::new().magenta();
    }

    /// Style for a run or process status word.
    #[must_use]
    pub fn status(&self, ok: bool) -> Style {
        if ok { self.success } else { self.error }
    }
}
