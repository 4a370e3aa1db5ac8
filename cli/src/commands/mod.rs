//! Command implementations, one module per subcommand.

pub mod deploy;
pub mod domain;
pub mod init;
pub mod logs;
pub mod rollback;
pub mod status;
