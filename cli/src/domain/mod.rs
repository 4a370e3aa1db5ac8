//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod history;
pub mod plan;
pub mod profile;
pub mod status;
pub mod step;
pub mod template;

pub use config::DeployConfig;
pub use error::{ConfigError, DeployError};
pub use history::{HistoryLedger, RunKind, RunRecord, RunStatus};
pub use profile::{AppKind, Auth, ProjectProfile, RemoteTarget};
pub use step::{Action, Captures, FailurePolicy, Plan, Step, StepAction};
