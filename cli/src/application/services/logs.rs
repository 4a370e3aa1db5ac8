//! Application service: server-side logs.

use anyhow::Result;

use crate::application::ports::RemoteSession;
use crate::application::services::record::release;
use crate::application::services::status::{HOST_DIR, read};
use crate::domain::profile::ProjectProfile;
use crate::domain::step::RemoteOp;
use crate::domain::template::NGINX_ERROR_LOG;

pub const DEFAULT_LOG_LINES: u32 = 50;

/// Upper bound on web server error lines, whatever `--lines` says.
pub const MAX_WEB_SERVER_LINES: u32 = 20;

/// One log source's tail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Excerpt {
    /// The source does not apply to this project.
    #[default]
    NotApplicable,
    Empty,
    Lines(String),
}

impl From<Option<String>> for Excerpt {
    fn from(output: Option<String>) -> Self {
        output.map_or(Self::Empty, Self::Lines)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogsReport {
    /// Tail of the marker log appended by the post-receive hook.
    pub deployments: Excerpt,
    /// Supervised process output.
    pub application: Excerpt,
    /// Nginx error log, when a domain is configured.
    pub web_server: Excerpt,
}

/// Tail every log source relevant to `profile`.
///
/// # Errors
///
/// Returns an error if the host cannot be reached.
pub async fn collect_logs(
    session: &mut impl RemoteSession,
    profile: &ProjectProfile,
    lines: u32,
) -> Result<LogsReport> {
    let report = tail_all(session, profile, lines.max(1)).await;
    release(session).await;
    report
}

async fn tail_all(
    session: &mut impl RemoteSession,
    profile: &ProjectProfile,
    lines: u32,
) -> Result<LogsReport> {
    session.connect().await?;
    let mut report = LogsReport {
        deployments: Excerpt::Empty,
        application: Excerpt::NotApplicable,
        web_server: Excerpt::NotApplicable,
    };

    let marker_log = profile.marker_log();
    if session.path_exists(&marker_log).await? {
        report.deployments = read(
            session,
            RemoteOp::TailFile {
                path: marker_log,
                lines,
            },
            HOST_DIR,
        )
        .await?
        .into();
    }

    if profile.is_supervised() {
        let output = read(
            session,
            RemoteOp::ProcessLogs {
                name: profile.name.clone(),
                lines,
            },
            HOST_DIR,
        )
        .await?;
        report.application = output.into();
    }

    if profile.domain.is_some() {
        let output = read(
            session,
            RemoteOp::TailFile {
                path: NGINX_ERROR_LOG.to_string(),
                lines: lines.min(MAX_WEB_SERVER_LINES),
            },
            HOST_DIR,
        )
        .await?;
        report.web_server = output.into();
    }

    Ok(report)
}
