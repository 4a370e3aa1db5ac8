//! Application service: server status snapshot.
//!
//! Read-only: every probe tolerates failure and no run record is written.

use anyhow::Result;

use crate::application::ports::{ExecOptions, HistoryStore, RemoteSession};
use crate::application::services::record::release;
use crate::domain::history::RunRecord;
use crate::domain::profile::ProjectProfile;
use crate::domain::status::{
    ProcessInfo, ResourceUsage, find_process, parse_certificate_expiry, parse_disk, parse_memory,
};
use crate::domain::step::{Captures, RemoteOp};

/// Records shown under "Recent deployments".
pub const RECENT_RUNS: usize = 5;

/// Host-wide probes run from `/` so a missing deploy path cannot break them.
pub(crate) const HOST_DIR: Option<&str> = Some("/");

#[derive(Debug, Clone, PartialEq)]
pub struct ServerStatus {
    pub uptime: Option<String>,
    pub memory: Option<ResourceUsage>,
    pub disk: Option<ResourceUsage>,
    pub branch: Option<String>,
    pub last_commit: Option<String>,
    /// `None` when the project kind is not supervised.
    pub process: Option<ProcessState>,
    pub domain: Option<DomainStatus>,
    pub recent: Vec<RunRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessState {
    Running(ProcessInfo),
    NotRegistered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainStatus {
    pub domain: String,
    /// `None` when no certificate was found.
    pub certificate_expiry: Option<String>,
}

/// Collect the status snapshot for `profile`.
///
/// # Errors
///
/// Returns an error if the host cannot be reached or the history cannot be
/// read.
pub async fn collect_status(
    session: &mut impl RemoteSession,
    history: &impl HistoryStore,
    profile: &ProjectProfile,
) -> Result<ServerStatus> {
    let status = probe(session, history, profile).await;
    release(session).await;
    status
}

async fn probe(
    session: &mut impl RemoteSession,
    history: &impl HistoryStore,
    profile: &ProjectProfile,
) -> Result<ServerStatus> {
    session.connect().await?;

    let uptime = read(session, RemoteOp::Uptime, HOST_DIR).await?;
    let memory = read(session, RemoteOp::MemoryUsage, HOST_DIR).await?;
    let disk = read(session, RemoteOp::DiskUsage, HOST_DIR).await?;
    let branch = read(session, RemoteOp::GitCurrentBranch, None).await?;
    let last_commit = read(session, RemoteOp::GitLastCommit, None).await?;

    let process = if profile.is_supervised() {
        let list = read(session, RemoteOp::ProcessList, HOST_DIR)
            .await?
            .unwrap_or_default();
        Some(match find_process(&list, &profile.name) {
            Some(info) => ProcessState::Running(info),
            None => ProcessState::NotRegistered,
        })
    } else {
        None
    };

    let domain = match &profile.domain {
        Some(domain) => {
            let certificate = read(
                session,
                RemoteOp::CertbotExpiry {
                    domain: domain.clone(),
                },
                HOST_DIR,
            )
            .await?;
            Some(DomainStatus {
                domain: domain.clone(),
                certificate_expiry: certificate.as_deref().and_then(parse_certificate_expiry),
            })
        }
        None => None,
    };

    let recent = history.load().await?.recent(RECENT_RUNS).to_vec();

    Ok(ServerStatus {
        uptime,
        memory: memory.as_deref().and_then(parse_memory),
        disk: disk.as_deref().and_then(parse_disk),
        branch,
        last_commit,
        process,
        domain,
        recent,
    })
}

/// Trimmed stdout of a lenient probe; `None` when it printed nothing.
///
/// `cwd` of `None` runs the probe in the deploy path.
pub(crate) async fn read(
    session: &mut impl RemoteSession,
    op: RemoteOp,
    cwd: Option<&str>,
) -> Result<Option<String>> {
    let result = session
        .execute(&op.render(&Captures::default()), &ExecOptions::lenient().in_dir(cwd))
        .await?;
    let stdout = result.stdout.trim();
    if !result.success() {
        tracing::debug!(?op, exit_code = result.exit_code, "probe exited non-zero");
    }
    Ok(Some(stdout.to_string()).filter(|s| !s.is_empty()))
}
