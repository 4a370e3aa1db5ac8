//! Domain types and validators for `deploy-config.yml`.
//!
//! Pure functions only: no I/O, no async, no filesystem access. The file
//! schema keeps the camelCase keys written by earlier releases so existing
//! configuration files keep loading.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::profile::{AppKind, Auth, BuildDirectives, ProjectProfile, RemoteTarget};

// ── Constants ────────────────────────────────────────────────────────────────

/// File name of the project configuration, relative to the working directory.
pub const CONFIG_FILE: &str = "deploy-config.yml";

/// Project-local state directory holding `history.json`.
pub const STATE_DIR: &str = ".autodeploy";

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 1800;

/// Project names become process names and nginx site file names.
static PROJECT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid regex")
});

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$")
        .expect("valid regex")
});

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `deploy-config.yml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployConfig {
    pub project: ProjectSection,
    pub server: ServerSection,
    pub git: GitSection,
    #[serde(default)]
    pub build: BuildSection,
    /// Public domain served by the web server, if any.
    #[serde(default)]
    pub domain: Option<String>,
    /// Contact address for certificate issuance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Sections this tool does not interpret (e.g. `database`), kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSection {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AppKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSection {
    pub host: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<PathBuf>,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub deploy_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitSection {
    pub repository: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_remote")]
    pub remote: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSection {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub start_command: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend_build_cmd: Option<String>,
    #[serde(default = "default_true")]
    pub composer_install: bool,
    #[serde(default = "default_true")]
    pub laravel_optimize: bool,
    #[serde(default)]
    pub run_migrations: bool,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            command: None,
            start_command: None,
            port: None,
            frontend_build_cmd: None,
            composer_install: true,
            laravel_optimize: true,
            run_migrations: false,
        }
    }
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_true() -> bool {
    true
}

/// Treat empty strings (written by older releases) the same as absent values.
fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

// ── Validation ───────────────────────────────────────────────────────────────

impl DeployConfig {
    /// Build the immutable project profile for one run.
    ///
    /// # Errors
    ///
    /// Returns an error if the project name or deploy path is missing, or the
    /// deploy path is not absolute.
    pub fn profile(&self) -> Result<ProjectProfile, ConfigError> {
        let name = non_empty(Some(&self.project.name))
            .ok_or(ConfigError::MissingField("project.name"))?;
        if !PROJECT_NAME_RE.is_match(&name) {
            return Err(ConfigError::InvalidValue {
                key: "project.name",
                value: name,
                valid: "letters, digits, '.', '_' and '-'".to_string(),
            });
        }
        let deploy_path = non_empty(Some(&self.server.deploy_path))
            .ok_or(ConfigError::MissingField("server.deployPath"))?;
        if !deploy_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                key: "server.deployPath",
                value: deploy_path,
                valid: "an absolute path, e.g. /var/www/html".to_string(),
            });
        }
        let deploy_path = match deploy_path.trim_end_matches('/') {
            "" => "/".to_string(),
            trimmed => trimmed.to_string(),
        };

        let domain = non_empty(self.domain.as_ref())
            .map(|d| validate_domain(&d))
            .transpose()?;

        Ok(ProjectProfile {
            name,
            kind: self.project.kind,
            build: BuildDirectives {
                command: non_empty(self.build.command.as_ref()),
                start_command: non_empty(self.build.start_command.as_ref()),
                frontend_build_command: non_empty(self.build.frontend_build_cmd.as_ref()),
                composer_install: self.build.composer_install,
                laravel_optimize: self.build.laravel_optimize,
                run_migrations: self.build.run_migrations,
            },
            port: self.build.port,
            deploy_path,
            domain,
            certificate_email: non_empty(self.email.as_ref()),
        })
    }

    /// Build the connection target, preferring key authentication.
    ///
    /// `password_override` (from the environment) replaces a stored password.
    ///
    /// # Errors
    ///
    /// Returns an error if the host or username is missing, or neither a key
    /// nor a password is available.
    pub fn remote_target(
        &self,
        password_override: Option<String>,
    ) -> Result<RemoteTarget, ConfigError> {
        let host = non_empty(Some(&self.server.host))
            .ok_or(ConfigError::MissingField("server.host"))?;
        let username = non_empty(Some(&self.server.username))
            .ok_or(ConfigError::MissingField("server.username"))?;

        let auth = if let Some(key) = &self.server.private_key {
            Auth::Key(key.clone())
        } else {
            let password = password_override
                .filter(|p| !p.is_empty())
                .or_else(|| self.server.password.clone().filter(|p| !p.is_empty()))
                .ok_or(ConfigError::MissingField("server.password or server.privateKey"))?;
            Auth::Password(password)
        };

        Ok(RemoteTarget {
            host,
            port: self.server.port,
            username,
            auth,
            command_timeout_secs: self
                .server
                .command_timeout_secs
                .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
        })
    }
}

/// Normalise and check a domain name before it reaches nginx or certbot.
///
/// # Errors
///
/// Returns an error if `domain` is not a plain DNS name such as
/// `app.example.com`.
pub fn validate_domain(domain: &str) -> Result<String, ConfigError> {
    let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    if DOMAIN_RE.is_match(&domain) {
        Ok(domain)
    } else {
        Err(ConfigError::InvalidValue {
            key: "domain",
            value: domain,
            valid: "a DNS name such as app.example.com".to_string(),
        })
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
