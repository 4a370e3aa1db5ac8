//! Application service: run bookkeeping shared by deploy and rollback.
//!
//! The ledger is mutated by one read-append-truncate-write per run.
//! Concurrent runs from the same workspace are last-writer-wins.

use anyhow::Result;

use crate::application::ports::{HistoryStore, RemoteSession};
use crate::application::services::step_runner::PlanOutcome;
use crate::domain::history::{RunRecord, RunStatus};

/// Disconnect if a connection was opened; problems are logged, not raised.
pub async fn release(session: &mut impl RemoteSession) {
    if !session.is_connected() {
        return;
    }
    if let Err(e) = session.disconnect().await {
        tracing::warn!(error = %e, "failed to close remote session");
    }
}

/// Complete `record` from the plan outcome, persist it, and surface the
/// plan's error if there was one.
pub async fn finish(
    history: &impl HistoryStore,
    mut record: RunRecord,
    outcome: PlanOutcome,
) -> Result<RunRecord> {
    let completed = outcome.completed;
    match outcome.failure {
        None => {
            record_run(history, record.clone()).await?;
            tracing::info!(commit = %record.commit, kind = ?record.kind, "run succeeded");
            Ok(record)
        }
        Some(failure) => {
            record.status = RunStatus::Failed;
            record.error = Some(format!("{:#}", failure.error));
            record.failed_step = Some(failure.step);
            record.completed_steps = Some(completed);
            if let Err(e) = record_run(history, record).await {
                tracing::warn!(error = %e, "failed to record failed run");
            }
            Err(failure.error)
        }
    }
}

/// Append `record` to the persisted ledger.
///
/// # Errors
///
/// Returns an error if the history cannot be loaded or saved.
pub async fn record_run(history: &impl HistoryStore, record: RunRecord) -> Result<()> {
    let mut ledger = history.load().await?;
    ledger.append(record);
    history.save(&ledger).await
}
