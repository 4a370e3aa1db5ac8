//! `autodeploy domain`: attach, detach and renew the project's domain.

use anyhow::{Context, Result};
use clap::Args;
use dialoguer::{Input, Select};

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::application::services::site::{
    SitePorts, attach_domain, detach_domain, renew_certificates,
};
use crate::domain::config::DeployConfig;
use crate::infra::config::YamlConfigStore;
use crate::infra::git::LocalGit;

#[derive(Args)]
#[group(multiple = false)]
pub struct DomainArgs {
    /// Serve the project on DOMAIN with an HTTPS certificate
    #[arg(short, long, value_name = "DOMAIN")]
    pub add: Option<String>,

    /// Stop serving DOMAIN
    #[arg(short, long, value_name = "DOMAIN")]
    pub remove: Option<String>,

    /// Show the configured domain
    #[arg(short, long)]
    pub list: bool,

    /// Renew certificates on the server
    #[arg(long)]
    pub renew: bool,
}

enum Operation {
    Add(String),
    Remove(Option<String>),
    List,
    Renew,
}

/// Entry point for `autodeploy domain`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the domain does not
/// match the configured one, or a server step fails.
pub async fn run(app: &AppContext, args: &DomainArgs) -> Result<()> {
    let operation = match (&args.add, &args.remove, args.list, args.renew) {
        (Some(domain), ..) => Operation::Add(domain.clone()),
        (_, Some(domain), ..) => Operation::Remove(Some(domain.clone())),
        (_, _, true, _) => Operation::List,
        (_, _, _, true) => Operation::Renew,
        _ => menu(app)?,
    };

    let mut config = app.config_store.load()?;
    match operation {
        Operation::List => app.renderer().domain(config.domain.as_deref()),
        Operation::Add(domain) => add(app, &mut config, &domain).await,
        Operation::Remove(domain) => remove(app, &mut config, domain.as_deref()).await,
        Operation::Renew => {
            let mut session = app.session(&config)?;
            let reporter = app.reporter();
            renew_certificates(ports(app, &mut session, &reporter), &config).await?;
            drop(reporter);
            app.output.success("Certificates renewed");
            Ok(())
        }
    }
}

async fn add(app: &AppContext, config: &mut DeployConfig, domain: &str) -> Result<()> {
    let mut session = app.session(config)?;
    let reporter = app.reporter();
    let domain = attach_domain(ports(app, &mut session, &reporter), config, domain).await?;
    drop(reporter);
    app.output.success(&format!("Live at https://{domain}"));
    Ok(())
}

async fn remove(app: &AppContext, config: &mut DeployConfig, domain: Option<&str>) -> Result<()> {
    let Some(current) = config.domain.clone() else {
        app.output.info("No domain configured.");
        return Ok(());
    };
    if let Some(requested) = domain {
        anyhow::ensure!(
            requested.trim().trim_end_matches('.').eq_ignore_ascii_case(&current),
            "{requested} is not configured for this project (current domain: {current})"
        );
    }
    if !app.confirm_destructive(&format!("Stop serving {current}?"))? {
        app.output.info("Cancelled.");
        return Ok(());
    }

    let mut session = app.session(config)?;
    let reporter = app.reporter();
    detach_domain(ports(app, &mut session, &reporter), config).await?;
    drop(reporter);
    app.output.success(&format!("{current} removed"));
    Ok(())
}

fn ports<'a, S, R>(
    app: &'a AppContext,
    session: &'a mut S,
    reporter: &'a R,
) -> SitePorts<'a, S, LocalGit, YamlConfigStore, R> {
    SitePorts {
        session,
        git: &app.git,
        config_store: &app.config_store,
        reporter,
    }
}

fn menu(app: &AppContext) -> Result<Operation> {
    anyhow::ensure!(
        !app.non_interactive,
        "choose an operation: --add, --remove, --list or --renew"
    );
    let choice = Select::new()
        .with_prompt("Domain")
        .items(&["Add a domain", "Remove the domain", "Show the domain", "Renew certificates"][..])
        .default(0)
        .interact()
        .context("domain menu")?;
    Ok(match choice {
        0 => Operation::Add(
            Input::<String>::new()
                .with_prompt("Domain")
                .interact_text()
                .context("domain prompt")?,
        ),
        1 => Operation::Remove(None),
        2 => Operation::List,
        _ => Operation::Renew,
    })
}
