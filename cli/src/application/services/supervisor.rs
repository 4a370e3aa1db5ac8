//! Application service: process supervisor adapter.
//!
//! The adapter, not the caller, decides between restart and start. A
//! registered process is never deleted; it is restarted in place so its
//! registration and restart counters survive.

use anyhow::Result;

use crate::application::ports::{ExecOptions, RemoteSession};
use crate::domain::step::Launch;
use crate::domain::template;

/// Which of the two primitives was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The process was not registered and has been started and persisted.
    Started,
    /// The process was registered and has been restarted.
    Restarted,
}

/// Make sure `name` is running the current code.
///
/// A failed existence query counts as "not registered".
///
/// # Errors
///
/// Returns an error if the restart, the start or the persist command fails.
pub async fn ensure_running(
    session: &mut impl RemoteSession,
    name: &str,
    launch: &Launch,
    cwd: Option<&str>,
) -> Result<EnsureOutcome> {
    let registered = match session
        .execute(&template::process_describe(name), &ExecOptions::lenient().in_dir(cwd))
        .await
    {
        Ok(result) => result.success(),
        Err(e) => {
            tracing::debug!(process = name, error = %e, "process query failed; treating as absent");
            false
        }
    };

    let checked = ExecOptions::checked().in_dir(cwd);
    if registered {
        tracing::info!(process = name, "restarting registered process");
        session.execute(&template::process_restart(name), &checked).await?;
        return Ok(EnsureOutcome::Restarted);
    }

    tracing::info!(process = name, "starting process");
    session
        .execute(&template::process_start(name, launch), &checked)
        .await?;
    session.execute(&template::process_persist(), &checked).await?;
    Ok(EnsureOutcome::Started)
}
