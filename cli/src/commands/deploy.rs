//! `autodeploy deploy [--branch <b>]`: push and deploy.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::deploy::{DeployRequest, run_deploy};

#[derive(Args)]
pub struct DeployArgs {
    /// Branch to deploy (defaults to `git.branch` from the configuration)
    #[arg(short, long)]
    pub branch: Option<String>,
}

/// Entry point for `autodeploy deploy`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the deploy fails.
/// A failed deploy is still recorded in the history.
pub async fn run(app: &AppContext, args: &DeployArgs) -> Result<()> {
    let (config, profile) = app.load_project()?;
    let branch = args.branch.as_deref().unwrap_or(&config.git.branch);
    let mut session = app.session(&config)?;

    app.output
        .header(&format!("Deploying {} ({branch})", profile.name));
    let reporter = app.reporter();
    let record = run_deploy(
        &mut session,
        &app.git,
        &app.history,
        &reporter,
        DeployRequest {
            profile: &profile,
            remote: &config.git.remote,
            branch,
        },
    )
    .await?;
    drop(reporter);

    app.renderer().run(&record, profile.domain.as_deref())
}
