//! Infrastructure implementation of the `HistoryStore` port.
//!
//! `JsonHistoryStore` loads and saves `.autodeploy/history.json` on a
//! blocking thread with an atomic write (temp file + rename).

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::HistoryStore;
use crate::domain::config::STATE_DIR;
use crate::domain::history::{HistoryLedger, RunRecord};

pub const HISTORY_FILE: &str = "history.json";

pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    /// History for the project in the current directory.
    #[must_use]
    pub fn new() -> Self {
        Self::with_path(PathBuf::from(STATE_DIR).join(HISTORY_FILE))
    }

    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    fn load_sync(&self) -> Result<HistoryLedger> {
        if !self.path.exists() {
            return Ok(HistoryLedger::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading history file {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(HistoryLedger::default());
        }
        let records: Vec<RunRecord> = serde_json::from_str(&content)
            .with_context(|| format!("parsing history file {}", self.path.display()))?;
        Ok(HistoryLedger::from_records(records))
    }

    fn save_sync(&self, ledger: &HistoryLedger) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(ledger).context("serializing history")?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
        }

        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("finalizing history file {}", self.path.display()))
    }
}

impl Default for JsonHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore for JsonHistoryStore {
    async fn load(&self) -> Result<HistoryLedger> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || JsonHistoryStore::with_path(path).load_sync())
            .await
            .context("history load task panicked")?
    }

    async fn save(&self, ledger: &HistoryLedger) -> Result<()> {
        let path = self.path.clone();
        let ledger = ledger.clone();
        tokio::task::spawn_blocking(move || JsonHistoryStore::with_path(path).save_sync(&ledger))
            .await
            .context("history save task panicked")?
    }
}
