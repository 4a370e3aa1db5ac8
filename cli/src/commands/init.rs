//! `autodeploy init`: configure the project and prepare the server.
//!
//! The configuration file is written only after provisioning succeeded, so a
//! failed first run leaves nothing behind locally.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use dialoguer::{Input, Password, Select};

use crate::app::AppContext;
use crate::application::ports::{ConfigStore, GitGateway};
use crate::application::services::provision::run_provision;
use crate::domain::config::{
    BuildSection, DEFAULT_SSH_PORT, DeployConfig, GitSection, ProjectSection, ServerSection,
};
use crate::domain::profile::{AppKind, DEFAULT_APP_PORT};

/// Entry point for `autodeploy init`.
///
/// # Errors
///
/// Returns an error if a prompt fails, the answers are invalid, or
/// provisioning fails.
pub async fn run(app: &AppContext) -> Result<()> {
    anyhow::ensure!(
        !app.non_interactive,
        "init asks for the server details and needs an interactive terminal"
    );

    let path = app.config_store.path();
    if app.config_store.exists()
        && !app.confirm(&format!("{} already exists. Overwrite?", path.display()), false)?
    {
        app.output.info("Cancelled.");
        return Ok(());
    }

    let config = prompt_config(app).await?;
    let profile = config.profile()?;
    let mut session = app.session(&config)?;

    app.output.header(&format!("Provisioning {}", config.server.host));
    let reporter = app.reporter();
    let report = run_provision(
        &mut session,
        &app.git,
        &reporter,
        &profile,
        &config.git.repository,
        &config.git.branch,
    )
    .await?;
    drop(reporter);

    app.config_store.save(&config)?;
    app.renderer()
        .provisioned(&report, &path.display().to_string())
}

async fn prompt_config(app: &AppContext) -> Result<DeployConfig> {
    let default_name = std::env::current_dir()
        .ok()
        .and_then(|dir| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "app".to_string());

    let name = text("Project name", Some(default_name))?;
    let kind = AppKind::ALL[Select::new()
        .with_prompt("Project type")
        .items(&AppKind::ALL.map(AppKind::as_str)[..])
        .default(0)
        .interact()
        .context("project type selection")?];

    app.output.header("Server");
    let host = text("Host", None)?;
    let username = text("Username", Some("root".to_string()))?;
    let port: u16 = Input::new()
        .with_prompt("SSH port")
        .default(DEFAULT_SSH_PORT)
        .interact_text()
        .context("SSH port")?;

    let use_key = Select::new()
        .with_prompt("Authentication")
        .items(&["password", "private key"][..])
        .default(0)
        .interact()
        .context("authentication selection")?
        == 1;
    let (password, private_key) = if use_key {
        let default_key = std::env::var("HOME")
            .map(|home| format!("{home}/.ssh/id_rsa"))
            .unwrap_or_default();
        (None, Some(PathBuf::from(text("Private key path", Some(default_key))?)))
    } else {
        let password = Password::new()
            .with_prompt("Password")
            .interact()
            .context("password prompt")?;
        (Some(password), None)
    };
    let deploy_path = text("Deploy path", Some(format!("/var/www/{name}")))?;

    app.output.header("Repository");
    let repository = text("Repository URL", None)?;
    let default_branch = app
        .git
        .current_branch()
        .await
        .unwrap_or_else(|_| "main".to_string());
    let branch = text("Branch", Some(default_branch))?;

    app.output.header("Build");
    let command = optional("Build command (empty for none)", None)?;
    let start_command = match kind {
        AppKind::Nodejs => optional("Start command", Some("npm start"))?,
        AppKind::Python => optional("Start command", Some("python3 app.py"))?,
        _ => None,
    };
    let app_port = if kind.is_proxied() {
        Some(
            Input::new()
                .with_prompt("Application port")
                .default(DEFAULT_APP_PORT)
                .interact_text()
                .context("application port")?,
        )
    } else {
        None
    };

    let domain = optional("Domain (empty to skip)", None)?;
    let email = match &domain {
        Some(domain) => optional("Certificate email", Some(&format!("admin@{domain}")))?,
        None => None,
    };

    let config = DeployConfig {
        project: ProjectSection { name, kind },
        server: ServerSection {
            host,
            username,
            password,
            private_key,
            port,
            deploy_path,
            command_timeout_secs: None,
        },
        git: GitSection {
            repository,
            branch,
            remote: "origin".to_string(),
        },
        build: BuildSection {
            command,
            start_command,
            port: app_port,
            ..BuildSection::default()
        },
        domain,
        email,
        extra: BTreeMap::new(),
    };
    config.remote_target(None)?;
    Ok(config)
}

fn text(prompt: &str, default: Option<String>) -> Result<String> {
    let mut input = Input::<String>::new().with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default);
    }
    let value = input.interact_text().with_context(|| prompt.to_string())?;
    Ok(value.trim().to_string())
}

fn optional(prompt: &str, default: Option<&str>) -> Result<Option<String>> {
    let mut input = Input::<String>::new().with_prompt(prompt).allow_empty(true);
    if let Some(default) = default {
        input = input.default(default.to_string());
    }
    let value = input.interact_text().with_context(|| prompt.to_string())?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}
