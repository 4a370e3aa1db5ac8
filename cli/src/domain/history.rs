//! Run records and the bounded history ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::DeployError;

/// Maximum number of records kept; older records are evicted.
pub const MAX_HISTORY: usize = 20;

/// Rollback candidates offered after skipping the current deployment.
pub const MAX_ROLLBACK_CANDIDATES: usize = 10;

/// Recorded when the local commit could not be read.
pub const UNKNOWN_COMMIT: &str = "unknown";

/// First seven characters of a commit id.
#[must_use]
pub fn short_commit(commit: &str) -> &str {
    commit.get(..7).unwrap_or(commit)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    #[default]
    Deploy,
    Rollback,
}

/// Terminal outcome of one deploy or rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub commit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Commit the server reported after pulling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_commit: Option<String>,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type", default)]
    pub kind: RunKind,
    /// Label of the step that failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    /// Steps completed before the failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_steps: Option<usize>,
}

impl RunRecord {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// Most-recent-first sequence of run records, never longer than
/// [`MAX_HISTORY`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLedger {
    records: Vec<RunRecord>,
}

impl HistoryLedger {
    /// Wrap records loaded from disk, enforcing the bound.
    #[must_use]
    pub fn from_records(mut records: Vec<RunRecord>) -> Self {
        records.truncate(MAX_HISTORY);
        Self { records }
    }

    /// Prepend `record`, evicting the oldest entries past the bound.
    pub fn append(&mut self, record: RunRecord) {
        self.records.insert(0, record);
        self.records.truncate(MAX_HISTORY);
    }

    /// The first `n` records, most recent first.
    #[must_use]
    pub fn recent(&self, n: usize) -> &[RunRecord] {
        &self.records[..n.min(self.records.len())]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    /// Successful records after the current one, up to
    /// [`MAX_ROLLBACK_CANDIDATES`].
    #[must_use]
    pub fn rollback_candidates(&self) -> Vec<&RunRecord> {
        self.records
            .iter()
            .filter(|r| r.is_success())
            .skip(1)
            .take(MAX_ROLLBACK_CANDIDATES)
            .collect()
    }

    /// Pick the commit to roll back to.
    ///
    /// An explicit commit is used verbatim. Otherwise the most recent
    /// candidate is chosen.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::NoRollbackTarget`] when no explicit commit is
    /// given and fewer than two successful records exist.
    pub fn select_rollback_target(&self, explicit: Option<&str>) -> Result<String, DeployError> {
        if let Some(commit) = explicit.map(str::trim).filter(|c| !c.is_empty()) {
            return Ok(commit.to_string());
        }
        self.rollback_candidates()
            .first()
            .map(|r| r.commit.clone())
            .ok_or(DeployError::NoRollbackTarget)
    }
}
