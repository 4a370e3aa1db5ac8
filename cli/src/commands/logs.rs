//! `autodeploy logs [--lines <n>]`: tail the server-side logs.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::logs::{DEFAULT_LOG_LINES, collect_logs};

#[derive(Args)]
pub struct LogsArgs {
    /// Number of lines per log
    #[arg(short = 'n', long, default_value_t = DEFAULT_LOG_LINES)]
    pub lines: u32,
}

/// Entry point for `autodeploy logs`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the server cannot be
/// reached.
pub async fn run(app: &AppContext, args: &LogsArgs) -> Result<()> {
    let (config, profile) = app.load_project()?;
    let mut session = app.session(&config)?;
    let report = collect_logs(&mut session, &profile, args.lines).await?;
    app.renderer().logs(&report)
}
