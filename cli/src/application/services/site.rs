//! Application service: domain and certificate management.
//!
//! The configuration is updated only after the server side succeeded.

use anyhow::Result;

use crate::application::ports::{ConfigStore, GitGateway, ProgressReporter, RemoteSession};
use crate::application::services::record::release;
use crate::application::services::step_runner::execute_plan;
use crate::domain::config::{DeployConfig, validate_domain};
use crate::domain::plan;
use crate::domain::step::Action;

/// Shared wiring for the site use-cases.
pub struct SitePorts<'a, S, G, C, R> {
    pub session: &'a mut S,
    pub git: &'a G,
    pub config_store: &'a C,
    pub reporter: &'a R,
}

/// Serve the project on `domain`: write and enable the virtual host, reload
/// nginx, issue a certificate, then store the domain in the configuration.
///
/// # Errors
///
/// Returns an error if the domain is invalid, any server step fails, or the
/// configuration cannot be saved.
pub async fn attach_domain<S, G, C, R>(
    ports: SitePorts<'_, S, G, C, R>,
    config: &mut DeployConfig,
    domain: &str,
) -> Result<String>
where
    S: RemoteSession,
    G: GitGateway,
    C: ConfigStore,
    R: ProgressReporter,
{
    let domain = validate_domain(domain)?;
    let profile = config.profile()?;
    let plan = plan::build(
        &profile,
        &Action::AttachDomain {
            domain: domain.clone(),
        },
    );
    let outcome = execute_plan(&plan, ports.session, ports.git, ports.reporter).await;
    release(ports.session).await;
    outcome.into_result()?;

    config.domain = Some(domain.clone());
    ports.config_store.save(config)?;
    tracing::info!(%domain, "domain attached");
    Ok(domain)
}

/// Disable the site and clear the domain from the configuration.
///
/// # Errors
///
/// Returns an error if a server step fails or the configuration cannot be
/// saved.
pub async fn detach_domain<S, G, C, R>(
    ports: SitePorts<'_, S, G, C, R>,
    config: &mut DeployConfig,
) -> Result<()>
where
    S: RemoteSession,
    G: GitGateway,
    C: ConfigStore,
    R: ProgressReporter,
{
    let profile = config.profile()?;
    let plan = plan::build(&profile, &Action::DetachDomain);
    let outcome = execute_plan(&plan, ports.session, ports.git, ports.reporter).await;
    release(ports.session).await;
    outcome.into_result()?;

    config.domain = None;
    ports.config_store.save(config)?;
    tracing::info!(project = %profile.name, "domain detached");
    Ok(())
}

/// Renew every certificate on the host.
///
/// # Errors
///
/// Returns an error if the renewal command fails.
pub async fn renew_certificates<S, G, C, R>(
    ports: SitePorts<'_, S, G, C, R>,
    config: &DeployConfig,
) -> Result<()>
where
    S: RemoteSession,
    G: GitGateway,
    C: ConfigStore,
    R: ProgressReporter,
{
    let profile = config.profile()?;
    let plan = plan::build(&profile, &Action::RenewCertificate);
    let outcome = execute_plan(&plan, ports.session, ports.git, ports.reporter).await;
    release(ports.session).await;
    outcome.into_result()?;
    Ok(())
}
