//! `autodeploy rollback [--version <commit>]`: return to an earlier deploy.

use anyhow::{Context, Result};
use clap::Args;
use dialoguer::Select;

use crate::app::AppContext;
use crate::application::ports::HistoryStore;
use crate::application::services::rollback::{run_rollback, select_target};
use crate::domain::history::{RunRecord, short_commit};
use crate::output::human::local_time;

#[derive(Args)]
pub struct RollbackArgs {
    /// Commit to roll back to (skips the selection menu)
    #[arg(short = 'v', long)]
    pub version: Option<String>,
}

/// Entry point for `autodeploy rollback`.
///
/// # Errors
///
/// Returns `NoRollbackTarget` when the history holds no earlier successful
/// deploy, or the error that aborted the rollback.
pub async fn run(app: &AppContext, args: &RollbackArgs) -> Result<()> {
    let (config, profile) = app.load_project()?;

    // Fails before any prompt or connection when there is nothing to go back to.
    let default_target = select_target(&app.history, args.version.as_deref()).await?;
    let target = match &args.version {
        Some(_) => default_target,
        None => choose(app, default_target).await?,
    };

    if !app.confirm_destructive(&format!(
        "Roll {} back to {}?",
        profile.name,
        short_commit(&target)
    ))? {
        app.output.info("Cancelled.");
        return Ok(());
    }

    let mut session = app.session(&config)?;
    app.output
        .header(&format!("Rolling back to {}", short_commit(&target)));
    let reporter = app.reporter();
    let record = run_rollback(
        &mut session,
        &app.git,
        &app.history,
        &reporter,
        &profile,
        &target,
    )
    .await?;
    drop(reporter);

    app.renderer().run(&record, profile.domain.as_deref())
}

/// Offer the rollback candidates; non-interactive runs take `default`.
async fn choose(app: &AppContext, default: String) -> Result<String> {
    if app.non_interactive {
        return Ok(default);
    }
    let ledger = app.history.load().await?;
    let candidates: Vec<&RunRecord> = ledger.rollback_candidates();
    let items: Vec<String> = candidates.iter().map(|r| describe(r)).collect();
    let idx = Select::new()
        .with_prompt("Roll back to")
        .items(&items[..])
        .default(0)
        .interact()
        .context("rollback selection")?;
    Ok(candidates
        .get(idx)
        .map_or(default, |record| record.commit.clone()))
}

fn describe(record: &RunRecord) -> String {
    let summary = record
        .message
        .as_deref()
        .and_then(|m| m.lines().next())
        .unwrap_or_default();
    format!(
        "{}  {}  {summary}",
        short_commit(&record.commit),
        local_time(record.timestamp)
    )
}
