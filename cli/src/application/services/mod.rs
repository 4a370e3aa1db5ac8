//! Application services: use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`: never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod deploy;
pub mod logs;
pub mod provision;
pub mod record;
pub mod rollback;
pub mod site;
pub mod status;
pub mod step_runner;
pub mod supervisor;
