//! `autodeploy status`: read-only server snapshot.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::status::collect_status;

/// Entry point for `autodeploy status`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the server cannot be
/// reached.
pub async fn run(app: &AppContext) -> Result<()> {
    let (config, profile) = app.load_project()?;
    let mut session = app.session(&config)?;
    let status = collect_status(&mut session, &app.history, &profile).await?;
    app.renderer().status(&profile.name, &status)
}
